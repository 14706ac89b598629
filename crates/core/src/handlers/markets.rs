//! Prediction-market summaries for Manifold and Polymarket.
//!
//! Both handlers reduce a market to `(label, probability)` pairs and render
//! them with [`highlight_outcomes`], which bolds every outcome priced at the
//! maximum.

use async_trait::async_trait;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use super::{Context, Handler, endpoint, segments};
use crate::humanize::{format_money, format_percent};
use crate::outcome::{Outcome, Rejection};
use crate::summary::{SEPARATOR, Summary, bold, collapse_whitespace, join_facets};
use crate::Result;

/// Most outcomes listed for multiple-choice markets.
const MAX_OUTCOMES: usize = 5;

/// Renders `label NN%` pairs, bolding the leader (every leader, on ties).
pub fn highlight_outcomes(outcomes: &[(String, f64)]) -> String {
    let max = outcomes.iter().map(|(_, p)| *p).fold(f64::NEG_INFINITY, f64::max);

    outcomes
        .iter()
        .map(|(label, p)| {
            let text = format!("{} {}", label, format_percent(*p));
            if (max - p).abs() <= f64::EPSILON { bold(&text) } else { text }
        })
        .collect::<Vec<_>>()
        .join(SEPARATOR)
}

fn market_line(question: &str, outcomes: &[(String, f64)], volume: f64, extra: Option<String>) -> Option<String> {
    let question = collapse_whitespace(question);
    if question.is_empty() && outcomes.is_empty() {
        return None;
    }

    let volume = if volume > 0.0 { format!("{} vol", format_money(volume)) } else { String::new() };
    Some(join_facets([question, highlight_outcomes(outcomes), volume, extra.unwrap_or_default()]))
}

fn top_outcomes(mut outcomes: Vec<(String, f64)>) -> Vec<(String, f64)> {
    outcomes.sort_by(|a, b| b.1.total_cmp(&a.1));
    outcomes.truncate(MAX_OUTCOMES);
    outcomes
}

async fn fetch_api<T: DeserializeOwned>(cx: &Context<'_>, url: Url) -> Result<T> {
    let request = cx.request(url).impersonate(false);
    cx.retriever().fetch_json(&request).await
}

fn finish(url: &Url, result: Result<Option<String>>) -> Outcome {
    match result {
        Ok(Some(line)) => Outcome::Summary(Summary::new(line)),
        Ok(None) => Outcome::Rejected(Rejection::NoContent),
        Err(err) => {
            debug!(url = %url, error = %err, "market unavailable");
            Outcome::Rejected(Rejection::from(&err))
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ManifoldMarket {
    #[serde(default)]
    question: String,
    #[serde(default)]
    outcome_type: String,
    probability: Option<f64>,
    #[serde(default)]
    answers: Vec<ManifoldAnswer>,
    #[serde(default)]
    volume: f64,
    #[serde(default)]
    is_resolved: bool,
    resolution: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ManifoldAnswer {
    text: String,
    #[serde(default)]
    probability: f64,
}

impl ManifoldMarket {
    fn line(self) -> Option<String> {
        let outcomes = match self.probability {
            Some(p) if self.outcome_type == "BINARY" => vec![("YES".to_string(), p), ("NO".to_string(), 1.0 - p)],
            _ => top_outcomes(self.answers.into_iter().map(|a| (collapse_whitespace(&a.text), a.probability)).collect()),
        };
        let resolved = self
            .is_resolved
            .then(|| format!("resolved {}", self.resolution.as_deref().unwrap_or("N/A")));

        market_line(&self.question, &outcomes, self.volume, resolved)
    }
}

/// `manifold.markets/{user}/{slug}` links.
#[derive(Debug, Clone, Copy, Default)]
pub struct ManifoldHandler;

#[async_trait]
impl Handler for ManifoldHandler {
    fn name(&self) -> &str {
        "manifold"
    }

    async fn handle(&self, cx: &Context<'_>, url: &Url) -> Outcome {
        let slug = match segments(url).as_slice() {
            [_, slug, ..] => slug.to_string(),
            _ => return Outcome::NotApplicable,
        };

        let result: Result<Option<String>> = async {
            let api = endpoint(&cx.config().endpoints.manifold, &format!("/v0/slug/{}", slug))?;
            let market: ManifoldMarket = fetch_api(cx, api).await?;
            Ok(market.line())
        }
        .await;
        finish(url, result)
    }
}

#[derive(Debug, Deserialize)]
struct PolymarketEvent {
    #[serde(default)]
    title: String,
    volume: Option<serde_json::Value>,
    #[serde(default)]
    markets: Vec<PolymarketMarket>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PolymarketMarket {
    #[serde(default)]
    question: String,
    group_item_title: Option<String>,
    outcomes: Option<String>,
    outcome_prices: Option<String>,
}

impl PolymarketMarket {
    /// `outcomes` and `outcomePrices` are JSON arrays encoded as strings.
    fn priced_outcomes(&self) -> Vec<(String, f64)> {
        let labels: Vec<String> = decode_string_array(self.outcomes.as_deref());
        let prices = decode_string_array(self.outcome_prices.as_deref())
            .into_iter()
            .map(|p| p.parse::<f64>().unwrap_or_default());
        labels.into_iter().zip(prices).collect()
    }
}

impl PolymarketEvent {
    fn line(self) -> Option<String> {
        let volume = self.volume.as_ref().and_then(number_or_string).unwrap_or_default();

        let outcomes = match self.markets.as_slice() {
            [market] => market.priced_outcomes(),
            markets => top_outcomes(
                markets
                    .iter()
                    .filter_map(|m| {
                        let label = m.group_item_title.clone().filter(|t| !t.is_empty()).unwrap_or_else(|| m.question.clone());
                        m.priced_outcomes().first().map(|(_, p)| (label, *p))
                    })
                    .collect(),
            ),
        };

        market_line(&self.title, &outcomes, volume, None)
    }
}

fn decode_string_array(raw: Option<&str>) -> Vec<String> {
    raw.and_then(|raw| serde_json::from_str(raw).ok()).unwrap_or_default()
}

fn number_or_string(value: &serde_json::Value) -> Option<f64> {
    match value {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

/// `polymarket.com/event/{slug}` links.
#[derive(Debug, Clone, Copy, Default)]
pub struct PolymarketHandler;

#[async_trait]
impl Handler for PolymarketHandler {
    fn name(&self) -> &str {
        "polymarket"
    }

    async fn handle(&self, cx: &Context<'_>, url: &Url) -> Outcome {
        let slug = match segments(url).as_slice() {
            ["event", slug, ..] => slug.to_string(),
            _ => return Outcome::NotApplicable,
        };

        let result: Result<Option<String>> = async {
            let mut api = endpoint(&cx.config().endpoints.polymarket, "/events")?;
            api.query_pairs_mut().append_pair("slug", &slug);
            let events: Vec<PolymarketEvent> = fetch_api(cx, api).await?;
            Ok(events.into_iter().next().and_then(PolymarketEvent::line))
        }
        .await;
        finish(url, result)
    }
}
