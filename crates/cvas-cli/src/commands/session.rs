use super::CommandContext;
use super::navigate::render_navigation;
use anyhow::{Result, anyhow, bail};
use cvas_session::router::ProfileCard;
use cvas_session::{GENERIC_EXCHANGE_MESSAGE, RegistrationRequest, RegistrationRole};
use tracing::{info, warn};

/// Field-level problems found before anything is sent
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormErrors {
    pub fields: Vec<(&'static str, &'static str)>,
}

impl FormErrors {
    fn require(&mut self, field: &'static str, value: &str, message: &'static str) {
        if value.trim().is_empty() {
            self.fields.push((field, message));
        }
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    #[cfg(test)]
    pub fn message_for(&self, field: &str) -> Option<&'static str> {
        self.fields.iter().find(|(name, _)| *name == field).map(|(_, message)| *message)
    }

    fn into_result(self) -> Result<()> {
        if self.is_empty() {
            return Ok(());
        }
        let messages: Vec<&str> = self.fields.iter().map(|(_, message)| *message).collect();
        Err(anyhow!(messages.join("\n")))
    }
}

#[derive(Debug, Clone, Default)]
pub struct LoginForm {
    pub service_number: String,
    pub password: String,
}

impl LoginForm {
    pub fn validate(&self) -> FormErrors {
        let mut errors = FormErrors::default();
        errors.require("serviceNumber", &self.service_number, "Service number is required");
        if self.password.is_empty() {
            errors.fields.push(("password", "Password is required"));
        }
        errors
    }
}

#[derive(Debug, Clone)]
pub struct RegisterForm {
    pub service_number: String,
    pub rank: String,
    pub name: String,
    pub password: String,
    pub role: RegistrationRole,
}

impl RegisterForm {
    pub fn validate(&self) -> FormErrors {
        let mut errors = FormErrors::default();
        errors.require("serviceNumber", &self.service_number, "Service number is required");
        errors.require("rank", &self.rank, "Rank is required");
        errors.require("name", &self.name, "Full name is required");
        if self.password.is_empty() {
            errors.fields.push(("password", "Password is required"));
        }
        errors
    }

    fn into_request(self) -> RegistrationRequest {
        RegistrationRequest {
            service_number: self.service_number.trim().to_string(),
            rank: self.rank.trim().to_string(),
            name: self.name.trim().to_string(),
            password: self.password,
            role: self.role,
        }
    }
}

pub async fn login(ctx: &CommandContext, form: LoginForm) -> Result<()> {
    form.validate().into_result()?;

    let identity = ctx.identity();
    if !identity.login(form.service_number.trim(), &form.password).await {
        warn!(service_number = %form.service_number.trim(), "Login rejected");
        bail!(GENERIC_EXCHANGE_MESSAGE);
    }
    info!(session_dir = %ctx.config.session_dir().display(), "Session stored");

    if let Some(user) = identity.snapshot().user() {
        println!("Logged in as {} {} ({})", user.rank, user.name, user.role);
    }
    println!();
    print!("{}", render_navigation(&ctx.navigator().navigate("/dashboard")));
    Ok(())
}

pub async fn register(ctx: &CommandContext, form: RegisterForm) -> Result<()> {
    form.validate().into_result()?;

    let request = form.into_request();
    if !ctx.identity().register(&request).await {
        warn!(service_number = %request.service_number, "Registration not accepted");
        bail!("Registration failed. Please try again.");
    }
    info!(service_number = %request.service_number, role = ?request.role, "Registration submitted");

    println!("Registration submitted for {}.", request.service_number);
    println!("An administrator must approve the account before you can log in.");
    Ok(())
}

pub fn logout(ctx: &CommandContext) {
    ctx.identity().logout();
    info!(session_dir = %ctx.config.session_dir().display(), "Session cleared");
    println!("Logged out.");
}

pub fn whoami(ctx: &CommandContext) {
    match ctx.identity().snapshot().user() {
        Some(user) => println!("{}", ProfileCard::for_user(user)),
        None => println!("Not logged in."),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn register_form() -> RegisterForm {
        RegisterForm {
            service_number: "SN030".to_string(),
            rank: "Corporal".to_string(),
            name: "Robin Hale".to_string(),
            password: "pw".to_string(),
            role: RegistrationRole::Worker,
        }
    }

    #[test]
    fn test_login_form_requires_both_fields() {
        let errors = LoginForm::default().validate();
        assert_eq!(errors.message_for("serviceNumber"), Some("Service number is required"));
        assert_eq!(errors.message_for("password"), Some("Password is required"));

        let blank = LoginForm {
            service_number: "   ".to_string(),
            password: "pw".to_string(),
        };
        assert_eq!(blank.validate().message_for("serviceNumber"), Some("Service number is required"));
        assert_eq!(blank.validate().message_for("password"), None);
    }

    #[test]
    fn test_login_form_accepts_filled_fields() {
        let form = LoginForm {
            service_number: "SN010".to_string(),
            password: " ".to_string(),
        };
        assert!(form.validate().is_empty());
        assert!(form.validate().into_result().is_ok());
    }

    #[test]
    fn test_register_form_validation() {
        assert!(register_form().validate().is_empty());

        let mut form = register_form();
        form.rank = String::new();
        form.name = " ".to_string();
        let errors = form.validate();
        assert_eq!(errors.message_for("rank"), Some("Rank is required"));
        assert_eq!(errors.message_for("name"), Some("Full name is required"));
        assert_eq!(errors.message_for("serviceNumber"), None);

        let message = errors.into_result().unwrap_err().to_string();
        assert_eq!(message, "Rank is required\nFull name is required");
    }

    #[test]
    fn test_register_request_is_trimmed() {
        let mut form = register_form();
        form.service_number = " SN030 ".to_string();
        let request = form.into_request();
        assert_eq!(request.service_number, "SN030");
        assert_eq!(request.password, "pw");
        assert_eq!(request.role, RegistrationRole::Worker);
    }
}
