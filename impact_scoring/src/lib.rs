/*!
Scores community-engaged research projects from the answers of an impact survey.

Three computations are available:
* the score of a sortable question, from the order in which a respondent
  ranked its weighted statements ([`score_ranking`]),
* the composite score of a macro category, the sum of four dimension
  scores ([`aggregate`]),
* the ripple-effect score of a project, computed on a synthetic influence
  network ([`propagation`]).

[`run_scoring`] runs all of them on a [`builder::SurveyResponse`].
See the [`manual`] for the input formats of the `ripplescore` program.
*/

mod config;
use log::{debug, info};

use std::collections::BTreeMap;

pub use crate::config::*;

pub mod builder;
pub mod catalog;
pub mod manual;
pub mod propagation;

use crate::builder::SurveyResponse;
use crate::catalog::Catalog;
use crate::propagation::PropagationReport;

pub type DimensionScores = BTreeMap<Dimension, f64>;
pub type CompositeScores = BTreeMap<Composite, f64>;

/// Scores a ranking with the default rules.
///
/// ```
/// use impact_scoring::{score_ranking, WeightTable};
///
/// let table = WeightTable::from_pairs(&[("A", 1.0), ("B", 0.78)])?;
/// let score = score_ranking(&["A".to_string()], &table);
/// assert_eq!(score, 1.0 / 4.027);
/// # Ok::<(), impact_scoring::ScoringErrors>(())
/// ```
pub fn score_ranking(ranked: &[String], table: &WeightTable) -> f64 {
    score_ranking_with_rules(ranked, table, &ScoringRules::DEFAULT_RULES)
}

/// The item at position `i` (0-based) contributes `weight * (1 - decay * i)`.
/// The sum is divided by the normalization constant.
///
/// Labels absent from the table contribute nothing. There is no floor on the
/// position factor: past 20 items it becomes negative.
pub fn score_ranking_with_rules(ranked: &[String], table: &WeightTable, rules: &ScoringRules) -> f64 {
    let mut total = 0.0;
    for (position, label) in ranked.iter().enumerate() {
        match table.weight(label) {
            Some(weight) => {
                total += weight * (1.0 - rules.position_decay * position as f64);
            }
            None => {
                debug!("score_ranking: no weight for {:?}, skipping", label);
            }
        }
    }
    total / rules.normalization_constant
}

/// The composite score of four dimension scores: their plain sum.
pub fn aggregate(scores: &[f64; 4]) -> f64 {
    scores.iter().sum()
}

/// Scores every dimension the catalog knows. Dimensions without an answer score 0.
pub fn score_dimensions(
    response: &SurveyResponse,
    catalog: &Catalog,
    rules: &ScoringRules,
) -> DimensionScores {
    let mut scores = DimensionScores::new();
    for dimension in Dimension::ALL {
        let score = match catalog.table(dimension) {
            Some(table) => score_ranking_with_rules(response.ranking(dimension), table, rules),
            None => 0.0,
        };
        debug!("score_dimensions: {} -> {}", dimension.key(), score);
        scores.insert(dimension, score);
    }
    scores
}

pub fn aggregate_composites(dimensions: &DimensionScores) -> CompositeScores {
    let mut composites = CompositeScores::new();
    for composite in Composite::ALL {
        let d = composite.dimensions();
        let parts = [
            dimension_score(dimensions, d[0]),
            dimension_score(dimensions, d[1]),
            dimension_score(dimensions, d[2]),
            dimension_score(dimensions, d[3]),
        ];
        composites.insert(composite, aggregate(&parts));
    }
    composites
}

fn dimension_score(dimensions: &DimensionScores, dimension: Dimension) -> f64 {
    dimensions.get(&dimension).cloned().unwrap_or_default()
}

/// All the scores of one response.
#[derive(PartialEq, Debug, Clone)]
pub struct ScoreCard {
    pub project_id: String,
    pub response_id: String,
    pub dimensions: DimensionScores,
    pub composites: CompositeScores,
    pub alignment_score: f64,
    pub propagation: PropagationReport,
}

impl ScoreCard {
    pub fn dimension(&self, dimension: Dimension) -> f64 {
        dimension_score(&self.dimensions, dimension)
    }

    pub fn composite(&self, composite: Composite) -> f64 {
        self.composites.get(&composite).cloned().unwrap_or_default()
    }

    pub fn propagation_score(&self) -> f64 {
        self.propagation.project_score
    }

    /// The scores under their stored names: `<dimension>_score`, then
    /// `<composite>_score`, then `propagation_score`.
    pub fn named_scores(&self) -> Vec<(String, f64)> {
        let mut res: Vec<(String, f64)> = Vec::new();
        for d in Dimension::ALL {
            res.push((format!("{}_score", d.key()), self.dimension(d)));
        }
        for c in Composite::ALL {
            res.push((format!("{}_score", c.key()), self.composite(c)));
        }
        res.push(("propagation_score".to_string(), self.propagation_score()));
        res
    }
}

/// Scores a response: every dimension, every composite and the ripple effect.
pub fn run_scoring(
    response: &SurveyResponse,
    catalog: &Catalog,
    scoring_rules: &ScoringRules,
    propagation_rules: &PropagationRules,
) -> Result<ScoreCard, ScoringErrors> {
    info!(
        "run_scoring: response {:?} of project {:?}",
        response.response_id, response.project_id
    );
    let inputs = response.propagation_inputs(propagation_rules);
    // Nothing is scored until the whole response is known to be valid.
    inputs.validate(propagation_rules)?;

    let dimensions = score_dimensions(response, catalog, scoring_rules);
    let composites = aggregate_composites(&dimensions);
    for (composite, score) in composites.iter() {
        info!("run_scoring: {} = {:.4}", composite.title(), score);
    }
    let propagation = propagation::score_inputs(&inputs, propagation_rules);

    Ok(ScoreCard {
        project_id: response.project_id.clone(),
        response_id: response.response_id.clone(),
        dimensions,
        composites,
        alignment_score: inputs.alignment_score,
        propagation,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::Builder;

    fn init() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn labels(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn table() -> WeightTable {
        WeightTable::from_pairs(&[
            ("A", 1.00),
            ("B", 0.95),
            ("C", 0.90),
            ("D", 0.84),
            ("E", 0.78),
        ])
        .unwrap()
    }

    #[test]
    fn empty_ranking_scores_zero() {
        assert_eq!(score_ranking(&[], &table()), 0.0);
    }

    #[test]
    fn single_top_item() {
        assert_eq!(score_ranking(&labels(&["A"]), &table()), 1.0 / 4.027);
    }

    #[test]
    fn two_items() {
        init();
        let score = score_ranking(&labels(&["B", "A"]), &table());
        let expected = (0.95 + 1.0 * 0.95) / 4.027;
        assert!((score - expected).abs() < 1e-12);
        assert!((score - 0.4718).abs() < 1e-4);
    }

    #[test]
    fn earlier_positions_weigh_more() {
        let first = score_ranking(&labels(&["A", "E"]), &table());
        let second = score_ranking(&labels(&["E", "A"]), &table());
        assert!(first > second);
    }

    #[test]
    fn unknown_labels_weigh_nothing() {
        init();
        let t = table();
        let with_unknown = score_ranking(&labels(&["A", "Z"]), &t);
        assert_eq!(with_unknown, score_ranking(&labels(&["A"]), &t));
        // The unknown label still takes up its position.
        let shifted = score_ranking(&labels(&["Z", "A"]), &t);
        assert!((shifted - 0.95 / 4.027).abs() < 1e-12);
    }

    #[test]
    fn full_ranking_in_weight_order() {
        let score = score_ranking(&labels(&["A", "B", "C", "D", "E"]), &table());
        let expected = (1.0 + 0.95 * 0.95 + 0.90 * 0.90 + 0.84 * 0.85 + 0.78 * 0.80) / 4.027;
        assert!((score - expected).abs() < 1e-12);
        assert!((score - 1.0).abs() < 0.01);
    }

    #[test]
    fn long_rankings_go_negative() {
        let t = WeightTable::from_pairs(&[("X", 1.0)]).unwrap();
        let mut ranked = labels(&[""; 22]);
        ranked.push("X".to_string());
        let score = score_ranking(&ranked, &t);
        assert!((score - (1.0 - 0.05 * 22.0) / 4.027).abs() < 1e-12);
        assert!(score < 0.0);
    }

    #[test]
    fn composites_are_plain_sums() {
        assert_eq!(aggregate(&[0.1, 0.2, 0.3, 0.4]), 0.1 + 0.2 + 0.3 + 0.4);
        assert_eq!(aggregate(&[0.0; 4]), 0.0);
    }

    #[test]
    fn response_without_answers() {
        init();
        let catalog = Catalog::standard();
        let response = Builder::new(&catalog).project("P", "R").build();
        let card = run_scoring(
            &response,
            &catalog,
            &ScoringRules::DEFAULT_RULES,
            &PropagationRules::DEFAULT_RULES,
        )
        .unwrap();
        let named = card.named_scores();
        assert_eq!(named.len(), 21 + 5 + 1);
        assert!(named.iter().all(|(_, v)| *v == 0.0));
        assert_eq!(named[0].0, "challenge_origin_score");
        assert_eq!(named[21].0, "context_score");
        assert_eq!(named[26].0, "propagation_score");
        assert_eq!(card.alignment_score, 0.75);
    }

    #[test]
    fn scores_a_full_response() {
        init();
        let catalog = Catalog::standard();
        let mut builder = Builder::new(&catalog).project("P", "R");
        builder
            .add_ranking(
                Dimension::Duration,
                &labels(&["Multiple Years (1)", "A Year or Less (0.95)"]),
            )
            .unwrap();
        builder
            .add_ranking(Dimension::Frequency, &labels(&["Daily or more"]))
            .unwrap();
        builder
            .add_ranking(
                Dimension::Voice,
                &labels(&["Materials and Events were culture-centered activities (1)"]),
            )
            .unwrap();
        builder.influence(Degree::First, Category::Faculty, 1.0).unwrap();
        let response = builder.build();
        let card = run_scoring(
            &response,
            &catalog,
            &ScoringRules::DEFAULT_RULES,
            &PropagationRules::DEFAULT_RULES,
        )
        .unwrap();

        let duration = (1.0 + 0.95 * 0.95) / 4.027;
        let frequency = 1.0 / 4.027;
        assert!((card.dimension(Dimension::Duration) - duration).abs() < 1e-12);
        assert_eq!(
            card.composite(Composite::InterventionsAndResearch),
            card.dimension(Dimension::Duration)
                + card.dimension(Dimension::Frequency)
                + card.dimension(Dimension::ResearchQuestions)
                + card.dimension(Dimension::DesignFacilitation)
        );
        assert!((card.composite(Composite::InterventionsAndResearch) - duration - frequency).abs() < 1e-12);
        // Voice has no composite.
        assert_eq!(card.dimension(Dimension::Voice), 1.0 / 4.027);
        assert!(Composite::ALL.iter().all(|c| !c.dimensions().contains(&Dimension::Voice)));
        // Two nodes, one edge.
        assert_eq!(card.propagation.edge_count, 1);
        assert!(card.propagation_score() > 0.0);
    }

    #[test]
    fn invalid_responses_are_not_scored() {
        let catalog = Catalog::standard();
        let mut response = Builder::new(&catalog).build();
        response.second_degree_likelihood.within_group = 0.95;
        assert!(run_scoring(
            &response,
            &catalog,
            &ScoringRules::DEFAULT_RULES,
            &PropagationRules::DEFAULT_RULES,
        )
        .is_err());
    }
}
