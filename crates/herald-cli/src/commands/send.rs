//! Send commands.

use clap::{Args, Subcommand};
use herald_channels::{
    DispatchRequest, Dispatcher, EmailPayload, NotifierRegistry, SendOutcome, SmsPayload,
};
use herald_core::Config;
use std::sync::Arc;

/// Send command arguments.
#[derive(Args)]
pub struct SendArgs {
    #[command(subcommand)]
    pub command: SendCommand,
}

#[derive(Subcommand)]
pub enum SendCommand {
    /// Send an email
    Email(EmailArgs),

    /// Send an SMS
    Sms(SmsArgs),
}

#[derive(Args)]
pub struct EmailArgs {
    /// Sender address
    #[arg(long)]
    pub from: String,

    /// Recipient address (repeatable)
    #[arg(long, required = true)]
    pub to: Vec<String>,

    /// Subject line
    #[arg(short, long)]
    pub subject: String,

    /// Plain-text body
    #[arg(long)]
    pub text: Option<String>,

    /// HTML body
    #[arg(long)]
    pub html: Option<String>,

    /// Phone number to text if the email cannot be delivered
    #[arg(long, value_name = "NUMBER")]
    pub fallback_sms: Option<String>,
}

#[derive(Args)]
pub struct SmsArgs {
    /// Recipient number in E.164 format (repeatable)
    #[arg(long, required = true)]
    pub to: Vec<String>,

    /// Message text
    #[arg(short, long)]
    pub message: String,

    /// Sender number (defaults to the configured number)
    #[arg(long)]
    pub from: Option<String>,
}

impl EmailArgs {
    fn payload(&self) -> EmailPayload {
        let mut payload =
            EmailPayload::new(self.from.clone(), self.to.clone(), self.subject.clone());
        payload.text_body = self.text.clone();
        payload.html_body = self.html.clone();
        payload
    }

    /// SMS sent when the email fails: the text body, or the subject.
    fn fallback(&self) -> Option<SmsPayload> {
        let number = self.fallback_sms.as_ref()?;
        let message = self.text.clone().unwrap_or_else(|| self.subject.clone());
        Some(SmsPayload::new(number.clone(), message))
    }
}

impl SmsArgs {
    fn payload(&self) -> SmsPayload {
        let payload = SmsPayload::new(self.to.clone(), self.message.clone());
        match &self.from {
            Some(from) => payload.with_from(from.clone()),
            None => payload,
        }
    }
}

/// Run the send command.
pub async fn run(args: SendArgs, config: Config) -> anyhow::Result<()> {
    let registry = Arc::new(NotifierRegistry::new());
    registry.initialize(config).await;
    let dispatcher = Dispatcher::new(registry.clone());

    let outcome = dispatch(&dispatcher, &args.command).await;
    registry.shutdown().await;

    println!("{}", serde_json::to_string_pretty(&outcome)?);
    if !outcome.is_success() {
        anyhow::bail!(
            "Notification failed: {}",
            outcome.error().unwrap_or("unknown error")
        );
    }
    Ok(())
}

async fn dispatch(dispatcher: &Dispatcher, command: &SendCommand) -> SendOutcome {
    match command {
        SendCommand::Email(args) => match args.fallback() {
            Some(sms) => {
                dispatcher
                    .send_with_fallback(
                        &DispatchRequest::for_payload(args.payload()),
                        &DispatchRequest::for_payload(sms),
                    )
                    .await
            }
            None => dispatcher.send_email(args.payload()).await,
        },
        SendCommand::Sms(args) => dispatcher.send_sms(args.payload()).await,
    }
}
