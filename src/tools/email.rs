//! Email adapters — `send_email` (SMTP via `lettre`), `search_emails` /
//! `get_email_details` / `download_attachments` / `manage_emails` (IMAP via
//! the `imap`/`mailparse` crates), and `compress_files` (shells out to the
//! platform archiver, the same way `tools::system::ProcessAdapter` shells
//! out for window/process control).
//!
//! Every IMAP/SMTP call is blocking I/O, so each runs inside
//! `tokio::task::spawn_blocking`, matching the pattern
//! `memory::embedding::EmbeddingProvider` uses for `fastembed`.

use async_trait::async_trait;
use lettre::message::Message as LettreMessage;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{SmtpTransport, Transport};
use secrecy::ExposeSecret;
use serde_json::{json, Value};

use crate::config::EmailConfig;
use crate::model::{Context, Step, StepResult, StepResultData};
use crate::tools::traits::ToolAdapter;

#[derive(Clone)]
pub struct EmailAdapter {
    config: EmailConfig,
}

impl EmailAdapter {
    pub fn new(config: EmailConfig) -> Self {
        EmailAdapter { config }
    }

    fn config_error(reason: impl Into<String>) -> StepResult {
        let mut result = StepResult::failure(reason);
        result.data = Some(StepResultData {
            is_config_error: true,
            ..Default::default()
        });
        result
    }

    async fn send_email(&self, step: &Step) -> StepResult {
        if !self.config.smtp_configured() {
            return Self::config_error("send_email: SMTP isn't configured (smtp_host/smtp_user/smtp_password)");
        }
        let Some(to) = step.params.get("to").and_then(Value::as_str) else {
            return StepResult::failure("send_email: missing 'to' parameter");
        };
        let subject = step.params.get("subject").and_then(Value::as_str).unwrap_or("(no subject)");
        let body = step.params.get("body").and_then(Value::as_str).unwrap_or("");

        let from = self.config.smtp_user.clone().unwrap_or_default();
        let host = self.config.smtp_host.clone().unwrap_or_default();
        let port = self.config.smtp_port;
        let user = self.config.smtp_user.clone().unwrap_or_default();
        let password = self
            .config
            .smtp_password
            .as_ref()
            .map(|p| p.expose_secret().to_string())
            .unwrap_or_default();
        let to = to.to_string();
        let subject = subject.to_string();
        let body = body.to_string();

        let result = tokio::task::spawn_blocking(move || -> Result<(), String> {
            let message = LettreMessage::builder()
                .from(from.parse().map_err(|e| format!("invalid from address: {}", e))?)
                .to(to.parse().map_err(|e| format!("invalid to address: {}", e))?)
                .subject(subject)
                .body(body)
                .map_err(|e| e.to_string())?;

            let creds = Credentials::new(user, password);
            let transport = SmtpTransport::relay(&host)
                .map_err(|e| e.to_string())?
                .port(port)
                .credentials(creds)
                .build();
            transport.send(&message).map_err(|e| e.to_string())?;
            Ok(())
        })
        .await;

        match result {
            Ok(Ok(())) => StepResult::success("email sent"),
            Ok(Err(e)) => StepResult::failure(format!("send_email failed: {}", e)),
            Err(e) => StepResult::failure(format!("send_email worker panicked: {}", e)),
        }
    }

    fn open_imap_session(&self) -> Result<imap::Session<Box<dyn imap::ImapConnection>>, String> {
        let host = self.config.imap_host.clone().ok_or("imap_host not set")?;
        let port = self.config.imap_port;
        let user = self.config.imap_user.clone().ok_or("imap_user not set")?;
        let password = self
            .config
            .imap_password
            .as_ref()
            .ok_or("imap_password not set")?
            .expose_secret()
            .to_string();

        let client = imap::ClientBuilder::new(&host, port)
            .connect()
            .map_err(|e| e.to_string())?;
        client.login(&user, &password).map_err(|(e, _)| e.to_string())
    }

    async fn search_emails(&self, step: &Step) -> StepResult {
        if !self.config.imap_configured() {
            return Self::config_error("search_emails: IMAP isn't configured (imap_host/imap_user/imap_password)");
        }
        let query = step.params.get("query").and_then(Value::as_str).unwrap_or("UNSEEN").to_string();
        let limit = step.params.get("limit").and_then(Value::as_u64).unwrap_or(20) as usize;
        let config = self.config.clone();

        let result = tokio::task::spawn_blocking(move || -> Result<Vec<Value>, String> {
            let adapter = EmailAdapter { config };
            let mut session = adapter.open_imap_session()?;
            session.select("INBOX").map_err(|e| e.to_string())?;
            let uids = session.search(&query).map_err(|e| e.to_string())?;
            let mut items = Vec::new();
            for uid in uids.into_iter().take(limit) {
                let messages = session.fetch(uid.to_string(), "ENVELOPE").map_err(|e| e.to_string())?;
                if let Some(msg) = messages.iter().next() {
                    if let Some(envelope) = msg.envelope() {
                        let subject = envelope
                            .subject
                            .map(|s| String::from_utf8_lossy(s).to_string())
                            .unwrap_or_default();
                        let from = envelope
                            .from
                            .as_ref()
                            .and_then(|addrs| addrs.first())
                            .and_then(|a| a.mailbox)
                            .map(|m| String::from_utf8_lossy(m).to_string())
                            .unwrap_or_default();
                        items.push(json!({"uid": uid, "subject": subject, "from": from}));
                    }
                }
            }
            let _ = session.logout();
            Ok(items)
        })
        .await;

        match result {
            Ok(Ok(items)) => {
                let mut result = StepResult::success(format!("{} email(s) matched", items.len()));
                result.data = Some(StepResultData {
                    extra: [("emails".to_string(), json!(items))].into(),
                    ..Default::default()
                });
                result
            }
            Ok(Err(e)) => StepResult::failure(format!("search_emails failed: {}", e)),
            Err(e) => StepResult::failure(format!("search_emails worker panicked: {}", e)),
        }
    }

    async fn get_email_details(&self, step: &Step) -> StepResult {
        if !self.config.imap_configured() {
            return Self::config_error("get_email_details: IMAP isn't configured");
        }
        let Some(uid) = step.params.get("uid").and_then(Value::as_u64) else {
            return StepResult::failure("get_email_details: missing 'uid' parameter");
        };
        let config = self.config.clone();

        let result = tokio::task::spawn_blocking(move || -> Result<Value, String> {
            let adapter = EmailAdapter { config };
            let mut session = adapter.open_imap_session()?;
            session.select("INBOX").map_err(|e| e.to_string())?;
            let messages = session.uid_fetch(uid.to_string(), "RFC822").map_err(|e| e.to_string())?;
            let raw = messages
                .iter()
                .next()
                .and_then(|m| m.body())
                .ok_or("message body not found")?;
            let parsed = mailparse::parse_mail(raw).map_err(|e| e.to_string())?;
            let subject = parsed
                .headers
                .iter()
                .find(|h| h.get_key_ref().eq_ignore_ascii_case("subject"))
                .map(|h| h.get_value())
                .unwrap_or_default();
            let body = parsed.get_body().unwrap_or_default();
            let attachment_names: Vec<String> = parsed
                .subparts
                .iter()
                .filter_map(|p| p.get_content_disposition().params.get("filename").cloned())
                .collect();
            let _ = session.logout();
            Ok(json!({"uid": uid, "subject": subject, "body": body, "attachments": attachment_names}))
        })
        .await;

        match result {
            Ok(Ok(details)) => {
                let mut result = StepResult::success("fetched email details");
                result.data = Some(StepResultData {
                    extra: [("email".to_string(), details)].into(),
                    ..Default::default()
                });
                result
            }
            Ok(Err(e)) => StepResult::failure(format!("get_email_details failed: {}", e)),
            Err(e) => StepResult::failure(format!("get_email_details worker panicked: {}", e)),
        }
    }

    async fn download_attachments(&self, step: &Step) -> StepResult {
        if !self.config.imap_configured() {
            return Self::config_error("download_attachments: IMAP isn't configured");
        }
        let Some(uid) = step.params.get("uid").and_then(Value::as_u64) else {
            return StepResult::failure("download_attachments: missing 'uid' parameter");
        };
        let Some(save_dir) = step.params.get("save_dir").and_then(Value::as_str) else {
            return StepResult::failure("download_attachments: missing 'save_dir' parameter");
        };
        let config = self.config.clone();
        let save_dir = save_dir.to_string();

        let result = tokio::task::spawn_blocking(move || -> Result<Vec<String>, String> {
            let adapter = EmailAdapter { config };
            let mut session = adapter.open_imap_session()?;
            session.select("INBOX").map_err(|e| e.to_string())?;
            let messages = session.uid_fetch(uid.to_string(), "RFC822").map_err(|e| e.to_string())?;
            let raw = messages
                .iter()
                .next()
                .and_then(|m| m.body())
                .ok_or("message body not found")?;
            let parsed = mailparse::parse_mail(raw).map_err(|e| e.to_string())?;
            std::fs::create_dir_all(&save_dir).map_err(|e| e.to_string())?;
            let mut saved = Vec::new();
            for part in &parsed.subparts {
                let disposition = part.get_content_disposition();
                if let Some(filename) = disposition.params.get("filename") {
                    let path = std::path::Path::new(&save_dir).join(filename);
                    let bytes = part.get_body_raw().map_err(|e| e.to_string())?;
                    std::fs::write(&path, bytes).map_err(|e| e.to_string())?;
                    saved.push(path.display().to_string());
                }
            }
            let _ = session.logout();
            Ok(saved)
        })
        .await;

        match result {
            Ok(Ok(saved)) => {
                let mut result = StepResult::success(format!("saved {} attachment(s)", saved.len()));
                result.data = Some(StepResultData {
                    extra: [("saved_paths".to_string(), json!(saved))].into(),
                    ..Default::default()
                });
                result
            }
            Ok(Err(e)) => StepResult::failure(format!("download_attachments failed: {}", e)),
            Err(e) => StepResult::failure(format!("download_attachments worker panicked: {}", e)),
        }
    }

    async fn manage_emails(&self, step: &Step) -> StepResult {
        if !self.config.imap_configured() {
            return Self::config_error("manage_emails: IMAP isn't configured");
        }
        let Some(uid) = step.params.get("uid").and_then(Value::as_u64) else {
            return StepResult::failure("manage_emails: missing 'uid' parameter");
        };
        let action = step.params.get("action").and_then(Value::as_str).unwrap_or("mark_read").to_string();
        let config = self.config.clone();

        let result = tokio::task::spawn_blocking(move || -> Result<(), String> {
            let adapter = EmailAdapter { config };
            let mut session = adapter.open_imap_session()?;
            session.select("INBOX").map_err(|e| e.to_string())?;
            let query = match action.as_str() {
                "mark_read" => "+FLAGS (\\Seen)",
                "mark_unread" => "-FLAGS (\\Seen)",
                "delete" => "+FLAGS (\\Deleted)",
                other => return Err(format!("unsupported action '{}'", other)),
            };
            session.uid_store(uid.to_string(), query).map_err(|e| e.to_string())?;
            if action == "delete" {
                session.expunge().map_err(|e| e.to_string())?;
            }
            let _ = session.logout();
            Ok(())
        })
        .await;

        match result {
            Ok(Ok(())) => StepResult::success(format!("applied action to email {}", uid)),
            Ok(Err(e)) => StepResult::failure(format!("manage_emails failed: {}", e)),
            Err(e) => StepResult::failure(format!("manage_emails worker panicked: {}", e)),
        }
    }

    async fn compress_files(&self, step: &Step) -> StepResult {
        let Some(files) = step.params.get("files").and_then(Value::as_array) else {
            return StepResult::failure("compress_files: missing 'files' parameter");
        };
        let Some(output) = step.params.get("output").and_then(Value::as_str) else {
            return StepResult::failure("compress_files: missing 'output' parameter");
        };
        let paths: Vec<String> = files.iter().filter_map(Value::as_str).map(String::from).collect();
        if paths.is_empty() {
            return StepResult::failure("compress_files: 'files' was empty");
        }

        let output = output.to_string();
        let result = tokio::task::spawn_blocking(move || -> Result<(), String> {
            #[cfg(target_os = "windows")]
            {
                let file_list = paths.join("','");
                let ps_command = format!("Compress-Archive -Path '{}' -DestinationPath '{}' -Force", file_list, output);
                let status = std::process::Command::new("powershell")
                    .args(["-NoProfile", "-Command", &ps_command])
                    .status()
                    .map_err(|e| e.to_string())?;
                if !status.success() {
                    return Err("Compress-Archive exited non-zero".to_string());
                }
            }
            #[cfg(not(target_os = "windows"))]
            {
                let status = std::process::Command::new("zip")
                    .arg("-r")
                    .arg(&output)
                    .args(&paths)
                    .status()
                    .map_err(|e| e.to_string())?;
                if !status.success() {
                    return Err("zip exited non-zero".to_string());
                }
            }
            Ok(())
        })
        .await;

        match result {
            Ok(Ok(())) => StepResult::success(format!("compressed {} file(s)", paths_len(step))),
            Ok(Err(e)) => StepResult::failure(format!("compress_files failed: {}", e)),
            Err(e) => StepResult::failure(format!("compress_files worker panicked: {}", e)),
        }
    }
}

fn paths_len(step: &Step) -> usize {
    step.params.get("files").and_then(Value::as_array).map(|a| a.len()).unwrap_or(0)
}

#[async_trait]
impl ToolAdapter for EmailAdapter {
    async fn execute(&self, step: &Step, _context: &mut Context) -> StepResult {
        match step.step_type.as_str() {
            "send_email" => self.send_email(step).await,
            "search_emails" => self.search_emails(step).await,
            "get_email_details" => self.get_email_details(step).await,
            "download_attachments" => self.download_attachments(step).await,
            "manage_emails" => self.manage_emails(step).await,
            "compress_files" => self.compress_files(step).await,
            other => StepResult::failure(format!("email adapter: unsupported type {}", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EmailConfig;

    #[tokio::test]
    async fn send_email_without_config_is_config_error() {
        let adapter = EmailAdapter::new(EmailConfig::default());
        let mut ctx = Context::new("2026-07-27T00:00:00Z");
        let step = Step::new("send_email", "send")
            .with_param("to", Value::String("a@example.com".into()))
            .with_param("subject", Value::String("hi".into()))
            .with_param("body", Value::String("hello".into()));
        let result = adapter.execute(&step, &mut ctx).await;
        assert!(!result.success);
        assert!(result.is_config_error());
    }

    #[tokio::test]
    async fn search_emails_without_config_is_config_error() {
        let adapter = EmailAdapter::new(EmailConfig::default());
        let mut ctx = Context::new("2026-07-27T00:00:00Z");
        let result = adapter.execute(&Step::new("search_emails", "search"), &mut ctx).await;
        assert!(!result.success);
        assert!(result.is_config_error());
    }
}
