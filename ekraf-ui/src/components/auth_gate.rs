//! Login / register gate in front of the dashboard.
//!
//! On mount the stored session token is checked against the auth service.
//! Demo mode (no hosted backend) signs a local demo user in directly.

use crate::components::LoadingSpinner;
use crate::state::{clear_session, load_session, AppState};
use dioxus::prelude::*;
use ekraf_core::session::{AuthForm, AuthGateState, User};

const FIELD: &str = "width: 100%; padding: 8px; margin: 4px 0 12px 0; border: 1px solid #BDBDBD; border-radius: 4px; box-sizing: border-box;";
const SUBMIT: &str = "width: 100%; padding: 10px; border: none; background: #1565C0; color: white; border-radius: 4px; cursor: pointer;";
const MIN_PASSWORD_LEN: usize = 6;

pub fn demo_user() -> User {
    User {
        id: "demo".into(),
        email: "demo@ekraf.local".into(),
        display_name: Some("Mode Demo".into()),
    }
}

/// Check a login form before it is sent.
pub fn validate_login(email: &str, password: &str) -> Result<(), &'static str> {
    if email.trim().is_empty() || password.is_empty() {
        return Err("Email dan kata sandi wajib diisi");
    }
    if !email.contains('@') {
        return Err("Format email tidak valid");
    }
    Ok(())
}

/// Check a registration form before it is sent.
pub fn validate_registration(email: &str, password: &str, confirm: &str) -> Result<(), &'static str> {
    validate_login(email, password)?;
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err("Kata sandi minimal 6 karakter");
    }
    if password != confirm {
        return Err("Konfirmasi kata sandi tidak cocok");
    }
    Ok(())
}

#[component]
pub fn AuthGate(children: Element) -> Element {
    let mut state = use_context::<AppState>();

    use_hook(move || {
        let Some(auth) = state.auth.peek().clone() else {
            state.gate.write().signed_in(demo_user());
            return;
        };
        spawn(async move {
            let Some(stored) = load_session() else {
                state.gate.write().session_checked(None);
                return;
            };
            match auth.current_user(&stored.access_token).await {
                Ok(Some(user)) => {
                    let mut session = stored;
                    session.user = user;
                    state.sign_in(session);
                }
                Ok(None) => {
                    log::info!("[EKRAF] auth: stored session expired");
                    clear_session();
                    state.gate.write().session_checked(None);
                }
                Err(e) => {
                    log::warn!("[EKRAF] auth: session check failed: {}", e);
                    state.gate.write().session_checked(None);
                }
            }
        });
    });

    let sign_out = move |_| {
        let auth = state.auth.peek().clone();
        let token = state.session.peek().as_ref().map(|s| s.access_token.clone());
        if let (Some(auth), Some(token)) = (auth, token) {
            spawn(async move {
                if let Err(e) = auth.sign_out(&token).await {
                    log::warn!("[EKRAF] auth: sign-out request failed: {}", e);
                }
            });
        }
        state.sign_out();
    };

    let gate = state.gate.read().clone();
    match gate {
        AuthGateState::CheckingSession => rsx! {
            LoadingSpinner { message: "Memeriksa sesi..." }
        },
        AuthGateState::Unauthenticated(AuthForm::Login) => rsx! { LoginForm {} },
        AuthGateState::Unauthenticated(AuthForm::Register) => rsx! { RegisterForm {} },
        AuthGateState::Authenticated(user) => {
            let demo = state.auth.read().is_none();
            let name = user.name().to_string();
            rsx! {
                div {
                    style: "display: flex; justify-content: flex-end; align-items: center; gap: 12px; font-size: 13px; color: #555; margin-bottom: 8px;",
                    span { "{name}" }
                    if !demo {
                        button {
                            style: "padding: 4px 12px; border: 1px solid #BDBDBD; background: white; border-radius: 4px; cursor: pointer;",
                            onclick: sign_out,
                            "Keluar"
                        }
                    }
                }
                {children}
            }
        }
    }
}

#[component]
fn FormCard(title: String, children: Element) -> Element {
    rsx! {
        div {
            style: "max-width: 380px; margin: 60px auto; padding: 24px; background: white; border: 1px solid #E0E0E0; border-radius: 8px; font-size: 14px;",
            h2 { style: "margin: 0 0 16px 0; font-size: 20px; text-align: center;", "{title}" }
            {children}
        }
    }
}

#[component]
fn LoginForm() -> Element {
    let mut state = use_context::<AppState>();
    let mut email = use_signal(String::new);
    let mut password = use_signal(String::new);
    let mut submitting = use_signal(|| false);
    let mut error_msg = use_signal(|| None::<String>);

    let submit = move |evt: Event<FormData>| {
        evt.prevent_default();
        let (email, password) = (email(), password());
        if let Err(reason) = validate_login(&email, &password) {
            error_msg.set(Some(reason.to_string()));
            return;
        }
        let Some(auth) = state.auth.peek().clone() else {
            return;
        };
        submitting.set(true);
        error_msg.set(None);
        spawn(async move {
            match auth.sign_in(email.trim(), &password).await {
                Ok(session) => state.sign_in(session),
                Err(e) => {
                    log::warn!("[EKRAF] auth: sign-in failed: {}", e);
                    error_msg.set(Some(e.to_string()));
                }
            }
            submitting.set(false);
        });
    };

    rsx! {
        FormCard {
            title: "Masuk",
            form {
                onsubmit: submit,
                label { "Email" }
                input {
                    style: FIELD,
                    r#type: "email",
                    value: "{email}",
                    oninput: move |evt: Event<FormData>| email.set(evt.value()),
                }
                label { "Kata sandi" }
                input {
                    style: FIELD,
                    r#type: "password",
                    value: "{password}",
                    oninput: move |evt: Event<FormData>| password.set(evt.value()),
                }
                if let Some(message) = error_msg() {
                    p { style: "color: #C62828; margin: 0 0 12px 0;", "{message}" }
                }
                button {
                    style: SUBMIT,
                    r#type: "submit",
                    disabled: submitting(),
                    if submitting() { "Memproses..." } else { "Masuk" }
                }
            }
            p {
                style: "text-align: center; margin-top: 16px;",
                "Belum punya akun? "
                a {
                    href: "#",
                    onclick: move |evt: Event<MouseData>| {
                        evt.prevent_default();
                        state.gate.write().toggle_form();
                    },
                    "Daftar"
                }
            }
        }
    }
}

#[component]
fn RegisterForm() -> Element {
    let mut state = use_context::<AppState>();
    let mut display_name = use_signal(String::new);
    let mut email = use_signal(String::new);
    let mut password = use_signal(String::new);
    let mut confirm = use_signal(String::new);
    let mut submitting = use_signal(|| false);
    let mut error_msg = use_signal(|| None::<String>);
    let mut notice = use_signal(|| None::<String>);

    let submit = move |evt: Event<FormData>| {
        evt.prevent_default();
        let (name, email, password) = (display_name(), email(), password());
        if let Err(reason) = validate_registration(&email, &password, &confirm()) {
            error_msg.set(Some(reason.to_string()));
            return;
        }
        let Some(auth) = state.auth.peek().clone() else {
            return;
        };
        submitting.set(true);
        error_msg.set(None);
        spawn(async move {
            match auth.sign_up(email.trim(), &password, name.trim()).await {
                Ok(Some(session)) => state.sign_in(session),
                Ok(None) => notice.set(Some(
                    "Pendaftaran berhasil. Periksa email Anda untuk konfirmasi, lalu masuk.".to_string(),
                )),
                Err(e) => {
                    log::warn!("[EKRAF] auth: sign-up failed: {}", e);
                    error_msg.set(Some(e.to_string()));
                }
            }
            submitting.set(false);
        });
    };

    rsx! {
        FormCard {
            title: "Daftar",
            form {
                onsubmit: submit,
                label { "Nama" }
                input {
                    style: FIELD,
                    value: "{display_name}",
                    oninput: move |evt: Event<FormData>| display_name.set(evt.value()),
                }
                label { "Email" }
                input {
                    style: FIELD,
                    r#type: "email",
                    value: "{email}",
                    oninput: move |evt: Event<FormData>| email.set(evt.value()),
                }
                label { "Kata sandi" }
                input {
                    style: FIELD,
                    r#type: "password",
                    value: "{password}",
                    oninput: move |evt: Event<FormData>| password.set(evt.value()),
                }
                label { "Ulangi kata sandi" }
                input {
                    style: FIELD,
                    r#type: "password",
                    value: "{confirm}",
                    oninput: move |evt: Event<FormData>| confirm.set(evt.value()),
                }
                if let Some(message) = error_msg() {
                    p { style: "color: #C62828; margin: 0 0 12px 0;", "{message}" }
                }
                if let Some(message) = notice() {
                    p { style: "color: #2E7D32; margin: 0 0 12px 0;", "{message}" }
                }
                button {
                    style: SUBMIT,
                    r#type: "submit",
                    disabled: submitting(),
                    if submitting() { "Memproses..." } else { "Daftar" }
                }
            }
            p {
                style: "text-align: center; margin-top: 16px;",
                "Sudah punya akun? "
                a {
                    href: "#",
                    onclick: move |evt: Event<MouseData>| {
                        evt.prevent_default();
                        state.gate.write().toggle_form();
                    },
                    "Masuk"
                }
            }
        }
    }
}
