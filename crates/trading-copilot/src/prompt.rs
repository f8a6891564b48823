//! Prompt Rendering
//!
//! Presentation only: turns typed snapshots into the text the model sees.
//! Guardrails never read anything produced here.

use std::fmt::Write;

use copilot_llm::Message;

use crate::model::{MarketSnapshot, PortfolioSnapshot};

const SYSTEM_PROMPT: &str =
    "You are a professional trading assistant focused on risk management and clear explanations.";

const REPLY_SCHEMA: &str = r#"{
    "action_type": "buy|sell|hold|watch|alert",
    "confidence": 0.0-1.0,
    "reasoning": "Clear explanation of why this action is suggested",
    "risk_level": "low|medium|high",
    "key_factors": ["Factor 1: description"],
    "technical_signals": ["Signal 1"],
    "suggested_quantity": 0,
    "suggested_price": 0.0,
    "potential_upside": "percentage",
    "potential_downside": "percentage",
    "risk_reward_ratio": 0.0,
    "time_horizon": "short|medium|long",
    "stop_loss_suggestion": 0.0,
    "take_profit_suggestion": 0.0
}"#;

pub const fn system_prompt() -> &'static str {
    SYSTEM_PROMPT
}

/// Context lines describing the symbol and the account
pub fn context_lines(market: &MarketSnapshot, portfolio: &PortfolioSnapshot) -> String {
    let mut lines = vec![
        format!("Stock: {}", market.symbol),
        format!("Current Price: ${:.2}", market.current_price),
        format!("Volume: {}", group_thousands(market.volume_24h, 0)),
        format!("24h Change: {:.2}%", market.price_change_24h),
    ];

    if let Some(rsi) = market.rsi {
        lines.push(format!("RSI: {rsi:.1}"));
    }
    if let Some(ratio) = market.volume_ratio() {
        lines.push(format!("Volume Ratio: {ratio:.2}x average"));
    }
    if market.news_sentiment != 0.0 {
        lines.push(format!("News Sentiment: {:.2} (-1 to 1)", market.news_sentiment));
    }
    if let Some(label) = &market.market_sentiment {
        lines.push(format!("Market Sentiment: {label}"));
    }

    lines.push(format!("Available Cash: ${}", group_thousands(portfolio.cash, 2)));
    lines.push(format!("Current Equity: ${}", group_thousands(portfolio.total_value, 2)));
    lines.push(format!("Buying Power: ${}", group_thousands(portfolio.buying_power, 2)));

    lines.join("\n")
}

/// Full user prompt asking for a JSON analysis
pub fn analysis_prompt(market: &MarketSnapshot, portfolio: &PortfolioSnapshot) -> String {
    let mut prompt = String::from(
        "You are an AI trading assistant analyzing a stock for potential trading opportunities.\n\
         Provide clear, actionable suggestions with confidence levels and risk assessments.\n\n",
    );

    let _ = write!(prompt, "Context:\n{}\n\n", context_lines(market, portfolio));
    let _ = write!(
        prompt,
        "Respond with a single JSON object with exactly these fields:\n\n{REPLY_SCHEMA}\n\n"
    );
    prompt.push_str(
        "Focus on:\n\
         1. Clear, explainable reasoning\n\
         2. Conservative confidence levels\n\
         3. Risk-aware suggestions with appropriate position sizing\n\n\
         This is for educational purposes only.",
    );
    prompt
}

/// System + user messages ready for an `LlmProvider`
pub fn analysis_messages(market: &MarketSnapshot, portfolio: &PortfolioSnapshot) -> Vec<Message> {
    vec![
        Message::system(system_prompt()),
        Message::user(analysis_prompt(market, portfolio)),
    ]
}

/// `1234567.5` with 2 decimals -> `1,234,567.50`
fn group_thousands(value: f64, decimals: usize) -> String {
    let formatted = format!("{:.*}", decimals, value.abs());
    let (int_part, frac_part) = formatted
        .split_once('.')
        .map_or((formatted.as_str(), None), |(i, f)| (i, Some(f)));

    let mut grouped = String::new();
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let sign = if value < 0.0 { "-" } else { "" };
    match frac_part {
        Some(frac) => format!("{sign}{grouped}.{frac}"),
        None => format!("{sign}{grouped}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_thousands() {
        assert_eq!(group_thousands(1_234_567.5, 2), "1,234,567.50");
        assert_eq!(group_thousands(999.0, 0), "999");
        assert_eq!(group_thousands(-25_000.0, 2), "-25,000.00");
    }

    #[test]
    fn test_context_lines() {
        let mut market = MarketSnapshot::new("AAPL", 150.25);
        market.volume_24h = 1_000_000.0;
        market.average_volume = Some(800_000.0);
        market.rsi = Some(65.0);
        market.price_change_24h = 2.5;

        let mut portfolio = PortfolioSnapshot::new(25_000.0, 50_000.0);
        portfolio.cash = 10_000.0;

        let text = context_lines(&market, &portfolio);
        assert!(text.starts_with("Stock: AAPL\nCurrent Price: $150.25"));
        assert!(text.contains("Volume: 1,000,000"));
        assert!(text.contains("RSI: 65.0"));
        assert!(text.contains("Volume Ratio: 1.25x average"));
        assert!(text.contains("Buying Power: $50,000.00"));
        assert!(!text.contains("News Sentiment"));
    }

    #[test]
    fn test_analysis_messages() {
        let messages = analysis_messages(
            &MarketSnapshot::new("MSFT", 400.0),
            &PortfolioSnapshot::default(),
        );
        assert_eq!(messages.len(), 2);
        assert!(messages[1].content.contains("\"action_type\""));
        assert!(messages[1].content.contains("Stock: MSFT"));
    }
}
