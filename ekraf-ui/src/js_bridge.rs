//! Typed wrappers around JS interop via `js_sys::eval()`.
//!
//! D3.js chart functions live in `assets/js/*.js` and are evaluated as globals
//! (no ES modules) once D3 has loaded. Payloads are passed as JSON string
//! literals so no hand escaping is needed.

use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;

static BAR_CHART_JS: &str = include_str!("../assets/js/bar-chart.js");

/// Quote `text` as a JS string literal.
fn js_string(text: &str) -> String {
    serde_json::to_string(text).unwrap_or_else(|_| "\"\"".to_string())
}

/// Execute arbitrary JS, wrapping in try/catch to avoid panics.
pub fn call_js(code: &str) {
    let wrapped = format!(
        "try {{ {} }} catch(e) {{ console.warn('EKRAF JS call failed:', e); }}",
        code
    );
    let _ = js_sys::eval(&wrapped);
}

/// Evaluate the chart scripts at global scope once D3 is available.
/// Safe to call more than once.
pub fn init_charts() {
    let store_js = format!(
        "if (!window.__ekrafChartsReady) {{ window.__ekrafChartScripts = {}; }}",
        js_string(BAR_CHART_JS)
    );
    let _ = js_sys::eval(&store_js);

    let init_js = r#"
        (function() {
            if (window.__ekrafChartsReady || window.__ekrafChartsPending) return;
            window.__ekrafChartsPending = true;
            var waitForD3 = setInterval(function() {
                if (typeof d3 !== 'undefined') {
                    clearInterval(waitForD3);
                    (0, eval)(window.__ekrafChartScripts);
                    delete window.__ekrafChartScripts;
                    if (typeof renderBarChart !== 'undefined') window.renderBarChart = renderBarChart;
                    window.__ekrafChartsReady = true;
                    delete window.__ekrafChartsPending;
                }
            }, 100);
        })();
    "#;
    let _ = js_sys::eval(init_js);
}

/// Render a grouped bar chart into `container_id` once D3, the chart script
/// and the container element all exist.
pub fn render_bar_chart(container_id: &str, data_json: &str, config_json: &str) {
    let id = js_string(container_id);
    call_js(&format!(
        r#"
        (function() {{
            var poll = setInterval(function() {{
                if (window.__ekrafChartsReady &&
                    typeof window.renderBarChart !== 'undefined' &&
                    document.getElementById({id})) {{
                    clearInterval(poll);
                    try {{
                        window.renderBarChart({id}, {data}, {config});
                    }} catch(e) {{ console.error('[EKRAF] renderBarChart error:', e); }}
                }}
            }}, 100);
        }})();
        "#,
        id = id,
        data = js_string(data_json),
        config = js_string(config_json),
    ));
}

/// Hand `text` to the browser as a file download. Does not need D3.
pub fn download_csv(filename: &str, text: &str) {
    call_js(&format!(
        r#"
        (function() {{
            var blob = new Blob([{text}], {{ type: 'text/csv;charset=utf-8' }});
            var url = URL.createObjectURL(blob);
            var a = document.createElement('a');
            a.href = url;
            a.download = {name};
            document.body.appendChild(a);
            a.click();
            document.body.removeChild(a);
            setTimeout(function() {{ URL.revokeObjectURL(url); }}, 0);
        }})();
        "#,
        text = js_string(text),
        name = js_string(filename),
    ));
}

/// Clear whatever a chart rendered into `container_id`.
pub fn destroy_chart(container_id: &str) {
    call_js(&format!(
        "var el = document.getElementById({}); if (el) el.innerHTML = '';",
        js_string(container_id)
    ));
}

/// Read the first file selected in the `<input type="file">` with `input_id`.
/// Returns the file name and its bytes.
pub async fn read_selected_file(input_id: &str) -> Result<(String, Vec<u8>), String> {
    let document = web_sys::window()
        .and_then(|w| w.document())
        .ok_or("no document")?;
    let input = document
        .get_element_by_id(input_id)
        .ok_or_else(|| format!("no element #{}", input_id))?
        .dyn_into::<web_sys::HtmlInputElement>()
        .map_err(|_| format!("#{} is not an input", input_id))?;
    let file = input
        .files()
        .and_then(|files| files.get(0))
        .ok_or("no file selected")?;

    let buffer = JsFuture::from(file.array_buffer())
        .await
        .map_err(|e| format!("failed to read {}: {:?}", file.name(), e))?;
    let bytes = js_sys::Uint8Array::new(&buffer).to_vec();
    Ok((file.name(), bytes))
}

/// Clear a file input so the same file can be picked again.
pub fn reset_file_input(input_id: &str) {
    let input = web_sys::window()
        .and_then(|w| w.document())
        .and_then(|d| d.get_element_by_id(input_id))
        .and_then(|el| el.dyn_into::<web_sys::HtmlInputElement>().ok());
    if let Some(input) = input {
        input.set_value("");
    }
}
