//! Assistant profiles and the placeholder shown before the first response.

/// Human-facing name of a profile id. Unknown ids read as "session".
pub fn display_name(profile: &str) -> &'static str {
    match profile {
        "interview" => "Job Interview",
        "sales" => "Sales Call",
        "meeting" => "Business Meeting",
        "presentation" => "Presentation",
        "negotiation" => "Negotiation",
        "exam" => "Exam Assistant",
        _ => "session",
    }
}

pub fn placeholder(profile: &str) -> String {
    format!("Hey, I'm listening to your {}?", display_name(profile))
}
