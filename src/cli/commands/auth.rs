use super::AppContext;
use crate::errors::AppError;
use crate::validation::{LoginForm, RegistrationForm};

pub struct LoginCommand {
    form: LoginForm,
}

impl LoginCommand {
    pub fn new(email: String, password: String) -> Self {
        Self {
            form: LoginForm { email, password },
        }
    }

    pub async fn execute(&self, ctx: &AppContext) -> Result<(), AppError> {
        println!("🔑 Signing in as {}...", self.form.email.trim());
        let manager = ctx.auth();
        let session = manager.login(&self.form).await?;

        println!("✅ Signed in");
        println!("   👤 User: {}", session.user.id);
        println!(
            "   ⏳ Session valid until {}",
            session.expires_at.format("%Y-%m-%d %H:%M UTC")
        );
        println!("   📁 Stored at {}", manager.sessions().path().display());
        println!();
        println!("📊 Next: client-board board show");
        Ok(())
    }
}

pub struct RegisterCommand {
    form: RegistrationForm,
}

impl RegisterCommand {
    pub fn new(username: String, email: String, password: String, confirm_password: String) -> Self {
        Self {
            form: RegistrationForm {
                username,
                email,
                password,
                confirm_password,
            },
        }
    }

    pub async fn execute(&self, ctx: &AppContext) -> Result<(), AppError> {
        println!("🆕 Creating account for {}...", self.form.email.trim());
        let signed_up = ctx.auth().register(&self.form).await?;

        println!("✅ Account created for {}", self.form.username.trim());
        if signed_up.session.is_some() {
            println!("   🔑 Signed in; the profile has administrator rights");
        } else {
            println!("   📧 Confirm your e-mail, then run: client-board login --email {}", self.form.email.trim());
        }
        Ok(())
    }
}

pub struct LogoutCommand;

impl LogoutCommand {
    pub async fn execute(&self, ctx: &AppContext) -> Result<(), AppError> {
        if ctx.auth().logout().await? {
            println!("👋 Signed out");
        } else {
            println!("ℹ️  No active session");
        }
        Ok(())
    }
}

pub struct WhoamiCommand;

impl WhoamiCommand {
    pub async fn execute(&self, ctx: &AppContext) -> Result<(), AppError> {
        let identity = ctx.auth().whoami().await?;

        println!("👤 {}", identity.display_name);
        if let Some(email) = &identity.user.email {
            println!("   📧 {email}");
        }
        println!("   🆔 {}", identity.user.id);
        match &identity.profile {
            Some(profile) if profile.is_admin => println!("   🛡️  Administrator"),
            Some(_) => println!("   👥 Member"),
            None => println!("   ⚠️  No profile row for this account"),
        }
        Ok(())
    }
}
