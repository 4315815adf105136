//! Slash commands typed into the compose line.

/// What a submitted compose line asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ComposeInput {
    /// Plain message body.
    Message(String),
    /// `/dm <user>`: switch to the direct conversation with `user`.
    Direct(String),
    /// `/channels`: open the channel list.
    Channels,
    /// `/settings`: open settings.
    Settings,
    /// `/quit` or `/q`.
    Quit,
    /// Malformed or unknown command; carries the usage hint to show.
    Invalid(String),
}

/// Classify a compose line. Lines not starting with `/` are messages.
pub fn parse(input: &str) -> ComposeInput {
    let Some(cmd) = input.trim_start().strip_prefix('/') else {
        return ComposeInput::Message(input.to_string());
    };

    let mut parts = cmd.split_whitespace();
    let command = parts.next().unwrap_or("");

    match command {
        "dm" | "msg" => match (parts.next(), parts.next()) {
            (Some(peer), None) => {
                let peer = peer.trim_start_matches('@');
                if peer.is_empty() {
                    ComposeInput::Invalid("Usage: /dm <user>".into())
                } else {
                    ComposeInput::Direct(peer.to_string())
                }
            },
            _ => ComposeInput::Invalid("Usage: /dm <user>".into()),
        },
        "channels" => ComposeInput::Channels,
        "settings" => ComposeInput::Settings,
        "quit" | "q" => ComposeInput::Quit,
        other => ComposeInput::Invalid(format!("Unknown command: /{other}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_is_a_message() {
        assert_eq!(parse("hello /world"), ComposeInput::Message("hello /world".into()));
    }

    #[test]
    fn dm_strips_at_sign() {
        assert_eq!(parse("/dm @alice"), ComposeInput::Direct("alice".into()));
        assert_eq!(parse("/msg bob"), ComposeInput::Direct("bob".into()));
    }

    #[test]
    fn dm_requires_exactly_one_user() {
        assert!(matches!(parse("/dm"), ComposeInput::Invalid(_)));
        assert!(matches!(parse("/dm a b"), ComposeInput::Invalid(_)));
        assert!(matches!(parse("/dm @"), ComposeInput::Invalid(_)));
    }

    #[test]
    fn navigation_commands() {
        assert_eq!(parse("/channels"), ComposeInput::Channels);
        assert_eq!(parse("/settings"), ComposeInput::Settings);
        assert_eq!(parse("/q"), ComposeInput::Quit);
    }

    #[test]
    fn unknown_command_names_itself() {
        assert_eq!(
            parse("/frobnicate"),
            ComposeInput::Invalid("Unknown command: /frobnicate".into())
        );
    }
}
