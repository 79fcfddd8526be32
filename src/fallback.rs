//! Canned replies for when the completion service is unavailable
//!
//! Topics are checked in a fixed priority order and the first keyword hit wins.

use chrono::{DateTime, Local, TimeZone};

/// Topics with a canned reply, in match priority order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Topic {
    Time,
    Weather,
    News,
    Joke,
    Help,
}

/// Keyword table, checked top to bottom
const TOPICS: &[(Topic, &[&str])] = &[
    (Topic::Time, &["time", "clock", "hour"]),
    (Topic::Weather, &["weather", "temperature", "rain", "sunny"]),
    (Topic::News, &["news", "headlines", "updates"]),
    (Topic::Joke, &["joke", "funny", "laugh"]),
    (Topic::Help, &["help", "what can you", "capabilities"]),
];

pub const WEATHER_REPLY: &str = "I can see you're asking about weather. \
    Check the weather widget on your mirror for current conditions!";

pub const NEWS_REPLY: &str =
    "For the latest news, check the news feed at the bottom of your mirror.";

pub const JOKE_REPLY: &str = "Why did the smart mirror go to therapy? \
    Because it had too many reflections!";

pub const HELP_REPLY: &str = "I'm your AI assistant! I can help with questions about time, \
    weather, news, and general queries. Currently running in fallback mode due to API limits.";

/// Format used for the time reply, e.g. `07:05 PM`
pub const TIME_FORMAT: &str = "%I:%M %p";

/// Find the first topic whose keywords appear in the query
#[must_use]
pub fn match_topic(query: &str) -> Option<Topic> {
    let lower = query.to_lowercase();
    TOPICS
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|k| lower.contains(k)))
        .map(|(topic, _)| *topic)
}

/// Reply to a query using the current local time
#[must_use]
pub fn respond(query: &str) -> String {
    respond_at(query, &Local::now())
}

/// Reply to a query as if the clock read `now`
#[must_use]
pub fn respond_at<Tz: TimeZone>(query: &str, now: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    match match_topic(query) {
        Some(Topic::Time) => format!(
            "The current time is {}. I'm running in fallback mode without AI API access.",
            now.format(TIME_FORMAT)
        ),
        Some(Topic::Weather) => WEATHER_REPLY.to_string(),
        Some(Topic::News) => NEWS_REPLY.to_string(),
        Some(Topic::Joke) => JOKE_REPLY.to_string(),
        Some(Topic::Help) => HELP_REPLY.to_string(),
        None => format!(
            "I understand you're asking: '{query}'. I'm currently in fallback mode as the AI \
             service is unavailable. Please check back later!"
        ),
    }
}

#[cfg(test)]
mod tests {
    use chrono::{FixedOffset, Utc};

    use super::*;

    fn at(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 19, hour, minute, 0).unwrap()
    }

    #[test]
    fn time_reply_uses_twelve_hour_clock() {
        let reply = respond_at("what time is it", &at(19, 5));
        assert!(reply.contains("07:05 PM"), "{reply}");

        let reply = respond_at("Time", &at(9, 30));
        assert!(reply.contains("09:30 AM"), "{reply}");
    }

    #[test]
    fn time_reply_respects_offset() {
        let ist = FixedOffset::east_opt(5 * 3600 + 1800).unwrap();
        let now = at(6, 0).with_timezone(&ist);
        assert!(respond_at("clock", &now).contains("11:30 AM"));
    }

    #[test]
    fn priority_order_first_match_wins() {
        assert_eq!(match_topic("what's the weather and time"), Some(Topic::Time));
        assert_eq!(match_topic("funny news headlines"), Some(Topic::News));
        assert_eq!(match_topic("help me laugh"), Some(Topic::Joke));
    }

    #[test]
    fn each_topic_matches() {
        assert_eq!(match_topic("Will it rain today?"), Some(Topic::Weather));
        assert_eq!(match_topic("any updates?"), Some(Topic::News));
        assert_eq!(match_topic("Tell me a joke"), Some(Topic::Joke));
        assert_eq!(match_topic("What can you do?"), Some(Topic::Help));
        assert_eq!(match_topic("list your capabilities"), Some(Topic::Help));
    }

    #[test]
    fn matching_is_case_insensitive() {
        assert_eq!(match_topic("TELL ME A JOKE"), Some(Topic::Joke));
        assert_eq!(respond_at("JOKE", &at(0, 0)), JOKE_REPLY);
    }

    #[test]
    fn unknown_query_is_echoed() {
        assert_eq!(match_topic("Who painted the Mona Lisa?"), None);
        let reply = respond_at("Who painted the Mona Lisa?", &at(12, 0));
        assert!(reply.contains("'Who painted the Mona Lisa?'"));
    }

    #[test]
    fn same_input_and_clock_is_deterministic() {
        let now = at(15, 45);
        assert_eq!(respond_at("hour", &now), respond_at("hour", &now));
    }
}
