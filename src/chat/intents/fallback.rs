//! Replies for input the router could not (or should not) dispatch.

/// Shown when a line looked like a command but routed nowhere useful.
pub fn no_match_response(message: &str) -> String {
    format!(
        "I couldn't turn `{}` into an action. Try `show my orders`, `set hourly rate to 50`, or `search gigs for logo design`.",
        message.trim()
    )
}

/// Generic conversational reply path for non-command chat.
pub fn conversational_reply(message: &str) -> String {
    let lower = message.trim().to_ascii_lowercase();
    if lower.is_empty() {
        return "I'm here whenever you need something.".into();
    }
    if lower.starts_with("hi") || lower.starts_with("hello") || lower.starts_with("hey") {
        return "Hey! Ask me about orders, profiles, gigs, or groups whenever you're ready.".into();
    }
    if lower.contains("thank") {
        return "Anytime!".into();
    }
    if lower.ends_with('?') {
        return "Good question. I can check orders, update your profile, or search listings if you phrase it as a command.".into();
    }
    "Got it. If you want me to do something, try `show my orders` or `search gigs for web design`."
        .into()
}

/// Reply path for messages referencing an image attachment; routed through
/// image analysis instead of text-only reasoning.
pub fn image_analysis_reply(attachment_name: Option<&str>) -> String {
    match attachment_name {
        Some(name) => format!(
            "Took a look at {name}. If you want feedback on it for a gig or portfolio, tell me what to focus on."
        ),
        None => "Took a look at the image. Tell me what you'd like me to focus on.".into(),
    }
}
