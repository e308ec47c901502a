use sessionkeeper::application_port::*;
use sessionkeeper::bootstrap;
use sessionkeeper::domain_model::*;
use sessionkeeper::logger::*;
use sessionkeeper::settings::*;
use std::sync::Arc;
use tokio::signal;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let logger = Logger::new_bootstrap();

    let project_settings = parse_settings(cli.settings.as_deref())?;
    debug!(?project_settings);
    let logger_config = LogConfig {
        filter: project_settings.log.filter.clone(),
    };
    logger.reload_from_config(&logger_config)?;

    let session: Arc<dyn SessionService> = Arc::new(bootstrap::try_build(&project_settings)?);
    let phase = session.load().await;

    match cli.command {
        Command::Status => {
            let subject = session
                .snapshot()
                .map(|pair| pair.subject_id.to_string())
                .unwrap_or_else(|| "-".to_string());
            println!("phase: {}", phase);
            println!("subject: {}", subject);
        }
        Command::Login {
            access_token,
            refresh_token,
            subject,
        } => {
            session
                .update(CredentialPair::new(access_token, refresh_token, subject))
                .await;
            println!("phase: {}", session.phase());
        }
        Command::Logout => {
            session.clear().await;
            println!("phase: {}", session.phase());
        }
        Command::Request {
            method,
            path,
            body,
            query,
            header,
        } => {
            let method: Method = method.parse().map_err(|e: String| anyhow::anyhow!(e))?;
            let mut request = ApiRequest::new(method, path);
            if let Some(body) = body {
                request = request.with_body(serde_json::from_str(&body)?);
            }
            for (key, value) in query {
                request = request.with_query(key, value);
            }
            for (name, value) in header {
                request = request.with_header(name, value);
            }

            let cancel = CancellationToken::new();
            let ctrl_c = cancel.clone();
            tokio::spawn(async move {
                if signal::ctrl_c().await.is_ok() {
                    ctrl_c.cancel();
                }
            });

            match session.send_until(request, cancel).await {
                Ok(response) => {
                    println!("{}", response.status);
                    println!("{}", response.body);
                }
                Err(SessionError::SessionExpired) => {
                    error!("session expired, sign in again");
                    return Err(anyhow::anyhow!("session expired"));
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    Ok(())
}
