use anyhow::{Result, bail};
use clap::ValueEnum;
use palaver_application::{ChatService, preview};
use palaver_core::message::MessageKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum KindArg {
    Text,
    Image,
    Video,
    Audio,
}

impl From<KindArg> for MessageKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Text => MessageKind::Text,
            KindArg::Image => MessageKind::Image,
            KindArg::Video => MessageKind::Video,
            KindArg::Audio => MessageKind::Audio,
        }
    }
}

pub fn list(service: &ChatService, owner: Option<&str>, json: bool) -> Result<()> {
    let view = match owner {
        Some(owner) => service.enter(owner)?,
        None => match service.enter_current()? {
            Some(view) => view,
            None => bail!("No --owner given and nobody is signed in"),
        },
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&view.conversations)?);
        return Ok(());
    }

    if let Some(partner) = &view.active_partner {
        println!("Opened chat with {partner}");
    }
    if view.conversations.is_empty() {
        println!("No conversations yet.");
        return Ok(());
    }
    for summary in &view.conversations {
        println!(
            "{:<24} {:<32} {}",
            summary.display_name, summary.partner_email, summary.preview
        );
    }
    Ok(())
}

pub fn show(service: &ChatService, owner: &str, partner: &str, json: bool) -> Result<()> {
    let Some(record) = service.read_conversation(owner, partner)? else {
        bail!("{owner} has no conversation with {partner}");
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&record)?);
        return Ok(());
    }

    println!("Chat with {}", service.resolve_name(partner, Some(&record))?);
    if record.messages.is_empty() {
        println!("No messages yet.");
    }
    for message in &record.messages {
        let direction = if message.sender == owner { ">" } else { "<" };
        let body = match message.kind {
            MessageKind::Text | MessageKind::Other(_) => message.content.clone(),
            _ => preview(Some(message)),
        };
        println!(
            "{} [{}] {}",
            direction,
            message.display_time.as_deref().unwrap_or("--:--"),
            body
        );
    }
    Ok(())
}

pub fn send(service: &ChatService, from: &str, to: &str, kind: KindArg, content: &str) -> Result<()> {
    let (message, delivery) = service.send(from, to, kind.into(), content)?;
    if delivery.is_noop() {
        bail!("Both --from and --to are required");
    }
    println!(
        "Delivered {} from {} to {} at {}{}",
        message.kind,
        from,
        to,
        message.timestamp,
        if delivery.notified { " (recipient notified)" } else { "" }
    );
    Ok(())
}
