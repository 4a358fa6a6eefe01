use crate::cli::MailerArgs;
use crate::config::Config;
use crate::db::Store;
use crate::db::repositories::platform::MailerSettings;
use crate::state::credential_cipher;

/// Initializes (`replace == false`) or overwrites the platform mailer.
pub async fn cmd_platform_mailer_set(
    config: &Config,
    args: MailerArgs,
    replace: bool,
) -> anyhow::Result<()> {
    let cipher = credential_cipher(config)?;
    let store = Store::new(&config.general.database_path).await?;
    let repo = store.platform_repo();

    let sender_email = args.sender_email.trim().to_string();
    if !sender_email.contains('@') {
        anyhow::bail!("--sender-email must be an email address");
    }

    let settings = MailerSettings {
        access_key_encrypted: cipher.encrypt(args.access_key.trim())?,
        secret_key_encrypted: cipher.encrypt(args.secret_key.trim())?,
        region: args.region.trim().to_string(),
        sender_email,
    };

    if replace {
        repo.replace(settings).await?;
        println!("✓ Platform mailer replaced.");
    } else {
        if repo.get().await?.is_some() {
            anyhow::bail!(
                "Platform mailer is already configured. Use `platform-mailer replace` to change it."
            );
        }
        repo.initialize(settings).await?;
        println!("✓ Platform mailer initialized.");
    }

    Ok(())
}

pub async fn cmd_platform_mailer_show(config: &Config) -> anyhow::Result<()> {
    let store = Store::new(&config.general.database_path).await?;

    match store.platform_repo().get().await? {
        Some(mailer) => {
            println!("Sender:  {}", mailer.sender_email);
            println!("Region:  {}", mailer.region);
            println!("Active:  {}", mailer.is_active);
            println!("Updated: {}", mailer.updated_at);
        }
        None => println!("Platform mailer is not configured."),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::CredentialCipher;

    fn args(sender_email: &str) -> MailerArgs {
        MailerArgs {
            access_key: "AKIA".to_string(),
            secret_key: "secret".to_string(),
            region: "us-east-1".to_string(),
            sender_email: sender_email.to_string(),
        }
    }

    #[tokio::test]
    async fn initialize_refuses_to_overwrite_existing_mailer() {
        let path = std::env::temp_dir().join(format!("xyno-mailer-{}.db", uuid::Uuid::new_v4()));
        let mut config = Config::default();
        config.general.database_path = format!("sqlite:{}", path.display());
        config.security.credential_key = CredentialCipher::generate_key();

        cmd_platform_mailer_set(&config, args("first@xyno.test"), false)
            .await
            .unwrap();

        let err = cmd_platform_mailer_set(&config, args("second@xyno.test"), false)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("already configured"));

        cmd_platform_mailer_set(&config, args("third@xyno.test"), true)
            .await
            .unwrap();

        let store = Store::new(&config.general.database_path).await.unwrap();
        let mailer = store.platform_repo().get().await.unwrap().unwrap();
        assert_eq!(mailer.sender_email, "third@xyno.test");

        let _ = std::fs::remove_file(path);
    }
}
