// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Static dashboard recommendations.

use crate::models::Recommendation;

fn recommendation(
    id: &str,
    kind: &str,
    title: &str,
    description: &str,
    priority: &str,
    action: &str,
) -> Recommendation {
    Recommendation {
        id: id.to_string(),
        kind: kind.to_string(),
        title: title.to_string(),
        description: description.to_string(),
        priority: priority.to_string(),
        action: action.to_string(),
    }
}

/// Recommendations shown to every user. Content is fixed; nothing here
/// depends on the user's weather or calendar yet.
pub fn static_recommendations() -> Vec<Recommendation> {
    vec![
        recommendation(
            "1",
            "weather",
            "Rain Expected",
            "Bring an umbrella today",
            "high",
            "Check weather before leaving",
        ),
        recommendation(
            "2",
            "calendar",
            "Plan Around Outdoor Events",
            "Review upcoming events that may be affected by the forecast",
            "medium",
            "Open calendar",
        ),
        recommendation(
            "3",
            "clothing",
            "Dress in Layers",
            "Temperatures vary through the day",
            "low",
            "Pack a light jacket",
        ),
    ]
}
