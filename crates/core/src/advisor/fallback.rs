//! Local plan used when the model's allocation answer is unusable.

use crate::domain::advisory::{AdvisoryOutput, AssetCategory, Provenance, Recommendation};
use crate::domain::contract::DEFAULT_ADVISORY_DISCLAIMER;
use crate::domain::wizard::{RiskProfile, WizardInput};
use crate::engine::EngineResult;
use crate::market;

/// Percent of the amount per layer. Always sums to 100.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayerSplit {
    pub immediate: f64,
    pub stability: f64,
    pub growth: f64,
}

pub fn layer_split(profile: RiskProfile) -> LayerSplit {
    let (immediate, stability, growth) = match profile {
        RiskProfile::Conservative => (50.0, 35.0, 15.0),
        RiskProfile::Moderate => (30.0, 40.0, 30.0),
        RiskProfile::Aggressive => (15.0, 35.0, 50.0),
    };
    LayerSplit {
        immediate,
        stability,
        growth,
    }
}

const GROWTH_BUCKET_SHARE: f64 = 0.4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Layer {
    Immediate,
    Stability,
    Growth,
    GrowthPick,
}

impl Layer {
    fn label(&self) -> &'static str {
        match self {
            Layer::Immediate => "Liquidity",
            Layer::Stability => "Stability",
            Layer::Growth => "Growth",
            Layer::GrowthPick => "Growth (picks)",
        }
    }
}

pub fn synthesize(input: &WizardInput, engine: &EngineResult) -> AdvisoryOutput {
    let recommendations = plan(input, engine)
        .into_iter()
        .map(|(_, rec)| rec)
        .collect();

    AdvisoryOutput {
        summary: format!(
            "Educational plan generated locally for {} {} with a {} profile.",
            input.amount,
            input.currency,
            input.risk_profile.label()
        ),
        recommendations,
        alternatives: Vec::new(),
        assumptions: vec![
            "The AI response was unavailable; percentages follow the standard split for this risk profile."
                .to_string(),
        ],
        disclaimer: DEFAULT_ADVISORY_DISCLAIMER.to_string(),
        advanced_analysis: None,
        provenance: Provenance::LocalFallback,
    }
}

struct Group {
    layer: Layer,
    items: Vec<String>,
    share: f64,
}

fn plan(input: &WizardInput, engine: &EngineResult) -> Vec<(Layer, Recommendation)> {
    let split = layer_split(input.risk_profile);
    let groups = vec![
        Group {
            layer: Layer::Immediate,
            items: engine.layers.immediate.clone(),
            share: split.immediate,
        },
        Group {
            layer: Layer::Stability,
            items: engine.layers.stability.clone(),
            share: split.stability,
        },
        Group {
            layer: Layer::Growth,
            items: engine.layers.growth.clone(),
            share: split.growth * GROWTH_BUCKET_SHARE,
        },
        Group {
            layer: Layer::GrowthPick,
            items: growth_picks(input, engine),
            share: split.growth * (1.0 - GROWTH_BUCKET_SHARE),
        },
    ];

    rebalance(groups)
        .iter()
        .flat_map(|g| layer_recs(input, &g.items, g.share, g.layer))
        .collect()
}

/// Empty growth groups hand their share to the sibling growth group. Whatever
/// is still held by an empty group goes to the last non-empty one, so the
/// shares always add up to 100.
fn rebalance(mut groups: Vec<Group>) -> Vec<Group> {
    let growth = groups.iter().position(|g| g.layer == Layer::Growth);
    let picks = groups.iter().position(|g| g.layer == Layer::GrowthPick);
    if let (Some(growth), Some(picks)) = (growth, picks) {
        for (from, to) in [(growth, picks), (picks, growth)] {
            if groups[from].items.is_empty() && !groups[to].items.is_empty() {
                groups[to].share += std::mem::take(&mut groups[from].share);
            }
        }
    }

    let orphaned: f64 = groups
        .iter_mut()
        .filter(|g| g.items.is_empty())
        .map(|g| std::mem::take(&mut g.share))
        .sum();
    if let Some(last) = groups.iter_mut().rev().find(|g| !g.items.is_empty()) {
        last.share += orphaned;
    }
    groups
}

/// Up to 2 example ETFs, 2 stocks and 1 crypto, as "SYMBOL (Name)".
fn growth_picks(input: &WizardInput, engine: &EngineResult) -> Vec<String> {
    let dashboard = market::dashboard_assets(&input.country);
    let of = |category: AssetCategory, n: usize| {
        dashboard
            .iter()
            .filter(move |a| a.category == category)
            .take(n)
            .map(|a| format!("{} ({})", a.symbol, a.name))
    };

    engine
        .analysis_assets
        .iter()
        .filter(|a| a.category == AssetCategory::Etf)
        .take(2)
        .map(|a| format!("{} ({})", a.symbol, a.name))
        .chain(of(AssetCategory::Stock, 2))
        .chain(of(AssetCategory::Crypto, 1))
        .collect()
}

fn layer_recs(
    input: &WizardInput,
    items: &[String],
    share: f64,
    layer: Layer,
) -> Vec<(Layer, Recommendation)> {
    if items.is_empty() || share <= 0.0 {
        return Vec::new();
    }
    let per_item = round2(share / items.len() as f64);
    // The last item absorbs the rounding remainder so the group keeps its exact share.
    let last_item = round2(share - per_item * (items.len() - 1) as f64);

    let pros = vec![
        match layer {
            Layer::Immediate => "Fast access to the money",
            _ => "Risk-adjusted return potential",
        }
        .to_string(),
        "Portfolio diversification".to_string(),
    ];
    let cons = vec![match layer {
        Layer::Growth | Layer::GrowthPick => "Higher short-term volatility",
        _ => "Limited return compared to equities",
    }
    .to_string()];

    items
        .iter()
        .enumerate()
        .map(|(i, name)| {
            let rec = Recommendation {
                title: name.clone(),
                rationale: format!(
                    "{}: aligned with the {} profile and {} horizon.",
                    layer.label(),
                    input.risk_profile.label(),
                    input.horizon.label()
                ),
                pros: pros.clone(),
                cons: cons.clone(),
                liquidity: match layer {
                    Layer::Immediate => "High",
                    _ => "Variable",
                }
                .to_string(),
                risk: input.risk_profile.label().to_string(),
                term: input.horizon.label().to_string(),
                allocation_percent: if i + 1 == items.len() { last_item } else { per_item },
                taxation: String::new(),
                protection: String::new(),
                how_to: String::new(),
                attention_points: Vec::new(),
            };
            (layer, rec)
        })
        .collect()
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::wizard::tests::sample_input;
    use crate::domain::wizard::{Horizon, Objective};
    use crate::engine::run_engine;

    fn layer_sums(input: &WizardInput) -> (f64, f64, f64) {
        let mut sums = (0.0, 0.0, 0.0);
        for (layer, rec) in plan(input, &run_engine(input)) {
            match layer {
                Layer::Immediate => sums.0 += rec.allocation_percent,
                Layer::Stability => sums.1 += rec.allocation_percent,
                Layer::Growth | Layer::GrowthPick => sums.2 += rec.allocation_percent,
            }
        }
        sums
    }

    fn assert_split(input: &WizardInput, expected: (f64, f64, f64)) {
        let got = layer_sums(input);
        for (g, e) in [(got.0, expected.0), (got.1, expected.1), (got.2, expected.2)] {
            assert!((g - e).abs() < 0.05, "got {got:?}, expected {expected:?}");
        }
    }

    #[test]
    fn conservative_split_is_50_35_15() {
        assert_split(&sample_input(RiskProfile::Conservative), (50.0, 35.0, 15.0));
    }

    #[test]
    fn moderate_and_aggressive_splits_hold_with_growth_buckets() {
        let mut moderate = sample_input(RiskProfile::Moderate);
        moderate.objectives = vec![Objective::Retirement];
        moderate.horizon = Horizon::LongTerm;
        assert_split(&moderate, (30.0, 40.0, 30.0));

        assert_split(&sample_input(RiskProfile::Aggressive), (15.0, 35.0, 50.0));
    }

    #[test]
    fn growth_share_is_split_40_60_between_buckets_and_picks() {
        let input = sample_input(RiskProfile::Aggressive);
        let plan = plan(&input, &run_engine(&input));

        let buckets: f64 = plan
            .iter()
            .filter(|(l, _)| *l == Layer::Growth)
            .map(|(_, r)| r.allocation_percent)
            .sum();
        let picks: Vec<&Recommendation> = plan
            .iter()
            .filter(|(l, _)| *l == Layer::GrowthPick)
            .map(|(_, r)| r)
            .collect();

        assert!((buckets - 20.0).abs() < 0.05);
        assert_eq!(picks.len(), 5);
        assert_eq!(picks[0].title, "IVVB11 (iShares S&P 500 index fund)");
        assert_eq!(picks[4].title, "BTC (Bitcoin)");
        assert!(picks.iter().all(|r| r.allocation_percent == 6.0));
    }

    fn total_percent(input: &WizardInput) -> f64 {
        plan(input, &run_engine(input))
            .iter()
            .map(|(_, r)| r.allocation_percent)
            .sum()
    }

    #[test]
    fn allocation_adds_up_to_the_amount_for_every_profile() {
        for risk in [RiskProfile::Conservative, RiskProfile::Moderate, RiskProfile::Aggressive] {
            for horizon in [Horizon::DailyLiquidity, Horizon::ShortTerm, Horizon::LongTerm] {
                let mut input = sample_input(risk);
                input.horizon = horizon;
                let allocated = input.amount * total_percent(&input) / 100.0;
                assert!(
                    (allocated - input.amount).abs() < 0.01,
                    "{risk:?}/{horizon:?} allocates {allocated} of {}",
                    input.amount
                );
            }
        }
    }

    #[test]
    fn empty_growth_groups_fold_into_the_last_non_empty_bucket() {
        let group = |layer, items: &[&str], share| Group {
            layer,
            items: items.iter().map(|s| s.to_string()).collect(),
            share,
        };
        let groups = rebalance(vec![
            group(Layer::Immediate, &["Tesouro Selic"], 30.0),
            group(Layer::Stability, &["CDB", "LCI"], 40.0),
            group(Layer::Growth, &[], 12.0),
            group(Layer::GrowthPick, &[], 18.0),
        ]);
        let shares: Vec<f64> = groups.iter().map(|g| g.share).collect();
        assert_eq!(shares, vec![30.0, 70.0, 0.0, 0.0]);

        let groups = rebalance(vec![
            group(Layer::Immediate, &["Tesouro Selic"], 15.0),
            group(Layer::Stability, &["CDB"], 35.0),
            group(Layer::Growth, &[], 20.0),
            group(Layer::GrowthPick, &["BTC (Bitcoin)"], 30.0),
        ]);
        let shares: Vec<f64> = groups.iter().map(|g| g.share).collect();
        assert_eq!(shares, vec![15.0, 35.0, 0.0, 50.0]);
    }

    #[test]
    fn synthesized_output_is_tagged_and_non_empty() {
        let input = sample_input(RiskProfile::Moderate);
        let output = synthesize(&input, &run_engine(&input));
        assert_eq!(output.provenance, Provenance::LocalFallback);
        assert!(!output.recommendations.is_empty());
        assert!(output.summary.contains("10000 BRL"));
        assert!(output
            .recommendations
            .iter()
            .all(|r| (0.0..=100.0).contains(&r.allocation_percent)));
    }
}
