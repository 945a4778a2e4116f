//! Per-platform prompt table

use crate::platforms::Platform;

pub struct PlatformPrompt {
    pub system: &'static str,
    /// Lead-in placed before the topic title
    pub request: &'static str,
    /// Output format instructions appended after the topic context
    pub format: Option<&'static str>,
}

const LINKEDIN: PlatformPrompt = PlatformPrompt {
    system: "You are a software engineer and content creator specialized in Next.js, Node.js, \
and AI/ML automation.\n\
Generate professional, educational LinkedIn posts that are story-driven and valuable to developers.\n\
Posts should be 150-200 words, include emojis strategically, have line breaks for readability, \
and end with an engaging question to encourage comments.\n\
Use a professional but approachable tone.",
    request: "Generate a LinkedIn post about",
    format: None,
};

const FACEBOOK: PlatformPrompt = PlatformPrompt {
    system: "You are a friendly community builder and developer sharing insights about web \
development and AI automation.\n\
Generate casual, friendly Facebook posts that feel personal and community-oriented.\n\
Posts should be 100-150 words, use emojis naturally, and include a call-to-action or question.\n\
Be conversational and approachable, like talking to friends in a developer community.",
    request: "Generate a Facebook post about",
    format: None,
};

const INSTAGRAM: PlatformPrompt = PlatformPrompt {
    system: "You are a creative developer creating Instagram captions for tech content.\n\
Generate short, punchy Instagram captions that are visual and emotion-focused.\n\
Captions should be 50-80 words, include 5-10 relevant trending hashtags at the end.\n\
Make it motivational, visual, and engaging. Use emojis throughout.",
    request: "Generate an Instagram caption about",
    format: None,
};

const X: PlatformPrompt = PlatformPrompt {
    system: "You are a tech thought leader creating concise, impactful tweets.\n\
Generate tweets that are punchy, conversational, and under 280 characters including hashtags.\n\
Include 2-3 relevant hashtags. Start with a strong hook. Be direct and engaging.",
    request: "Generate a tweet (under 280 chars) about",
    format: None,
};

const TIKTOK: PlatformPrompt = PlatformPrompt {
    system: "You are a developer creating TikTok video scripts for tech audiences.\n\
Generate a 15-second video script (hook, value, CTA) with short sentences perfect for speaking.\n\
Include suggested visuals and key moments. Make it engaging, educational, and entertaining.\n\
Script should be 50-75 words total, with clear sections for hook, middle content, and call-to-action.",
    request: "Generate a 15-second TikTok video script about",
    format: Some(
        "Format:\n\
[HOOK] - Opening line to grab attention (5 seconds)\n\
[MIDDLE] - Main value/point (7 seconds)\n\
[CTA] - Call to action or question (3 seconds)\n\
[VISUALS] - Suggested visual elements",
    ),
};

pub fn prompt_for(platform: Platform) -> &'static PlatformPrompt {
    match platform {
        Platform::LinkedIn => &LINKEDIN,
        Platform::Facebook => &FACEBOOK,
        Platform::Instagram => &INSTAGRAM,
        Platform::X => &X,
        Platform::TikTok => &TIKTOK,
    }
}

/// Full prompt text sent to the provider for one platform
pub fn build_prompt(platform: Platform, title: &str, description: Option<&str>) -> String {
    let prompt = prompt_for(platform);

    let mut text = format!("{}\n\n{}: {}", prompt.system, prompt.request, title.trim());
    if let Some(context) = description.map(str::trim).filter(|d| !d.is_empty()) {
        text.push_str("\n\nContext: ");
        text.push_str(context);
    }
    if let Some(format) = prompt.format {
        text.push_str("\n\n");
        text.push_str(format);
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_includes_title_and_context() {
        let prompt = build_prompt(Platform::LinkedIn, "Async Rust", Some("tokio in prod"));
        assert!(prompt.contains("Generate a LinkedIn post about: Async Rust"));
        assert!(prompt.contains("Context: tokio in prod"));
    }

    #[test]
    fn test_blank_description_is_omitted() {
        let prompt = build_prompt(Platform::X, "Async Rust", Some("   "));
        assert!(!prompt.contains("Context:"));
    }

    #[test]
    fn test_only_tiktok_requests_script_sections() {
        for platform in Platform::ALL {
            let prompt = build_prompt(platform, "Topic", None);
            assert_eq!(prompt.contains("[HOOK]"), platform == Platform::TikTok);
        }
    }
}
