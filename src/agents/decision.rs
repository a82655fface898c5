use serde::{Deserialize, Serialize};

/// Destination of a routing decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Route {
    AbTest,
    Segmentation,
    General,
    Finish,
}

impl Route {
    /// Token used in the supervisor's JSON protocol.
    pub fn wire_name(&self) -> &'static str {
        match self {
            Self::AbTest => "AB_Agent",
            Self::Segmentation => "Segmentation_Agent",
            Self::General => "General_Agent",
            Self::Finish => "FINISH",
        }
    }

    /// Parse a wire token. Anything outside the closed set is `None`.
    pub fn from_wire(s: &str) -> Option<Self> {
        match s {
            "AB_Agent" => Some(Self::AbTest),
            "Segmentation_Agent" => Some(Self::Segmentation),
            "General_Agent" => Some(Self::General),
            "FINISH" => Some(Self::Finish),
            _ => None,
        }
    }
}

impl std::fmt::Display for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.wire_name())
    }
}

/// The supervisor's resolved decision for one turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutingDecision {
    pub route: Route,
    /// Assistant message announcing the decision (or the direct answer on
    /// FINISH)
    pub announcement: String,
}

#[derive(Debug, Deserialize)]
struct DecisionWire {
    #[serde(default)]
    next: Option<String>,
    #[serde(default)]
    reasoning: String,
    #[serde(default)]
    message: Option<String>,
}

/// Interpret a raw supervisor reply.
///
/// The happy path parses a JSON object (optionally inside one fenced code
/// block) with `next`, `reasoning`, and `message` fields. A `next` outside
/// the valid set remaps to the general agent rather than erroring. When the
/// reply isn't parseable at all, keyword matching on the lowercased text
/// picks the destination, defaulting to the general agent; a request is
/// never dropped for being malformed.
pub fn interpret_reply(raw: &str) -> RoutingDecision {
    let stripped = strip_code_fence(raw);

    if let Ok(wire) = serde_json::from_str::<DecisionWire>(stripped.trim()) {
        // An absent destination means the supervisor chose to finish; a
        // present-but-unknown one degrades to the general agent.
        let route = match wire.next.as_deref() {
            None => Route::Finish,
            Some(next) => Route::from_wire(next).unwrap_or(Route::General),
        };
        let announcement = if route == Route::Finish {
            match wire.message.filter(|m| !m.is_empty()) {
                Some(message) => message,
                None => "Analysis not supported.".to_string(),
            }
        } else {
            format!("Routing to {}. Reason: {}", route.wire_name(), wire.reasoning)
        };
        return RoutingDecision {
            route,
            announcement,
        };
    }

    let route = keyword_route(raw);
    RoutingDecision {
        route,
        announcement: format!("Routing to {}", route.wire_name()),
    }
}

/// Strip exactly one fenced code block, preferring a ```json fence.
///
/// Returns the text between the first opening fence and the next fence
/// marker; text without fences passes through unchanged.
pub fn strip_code_fence(text: &str) -> &str {
    if let Some(start) = text.find("```json") {
        let body = &text[start + "```json".len()..];
        return match body.find("```") {
            Some(end) => &body[..end],
            None => body,
        };
    }
    if let Some(start) = text.find("```") {
        let body = &text[start + 3..];
        return match body.find("```") {
            Some(end) => &body[..end],
            None => body,
        };
    }
    text
}

/// Keyword fallback, in priority order.
fn keyword_route(raw: &str) -> Route {
    let lowered = raw.to_lowercase();
    if lowered.contains("ab_agent") || lowered.contains("a/b") {
        Route::AbTest
    } else if lowered.contains("segmentation") || lowered.contains("cluster") {
        Route::Segmentation
    } else {
        Route::General
    }
}
