pub use crate::config::*;

use std::collections::{BTreeMap, HashSet};

use log::debug;

use crate::catalog::Catalog;

/// How aligned the research team and the partners were, each between 0 and 1.
#[derive(PartialEq, Debug, Clone, Copy)]
pub struct AlignmentRatings {
    pub goals: f64,
    pub values: f64,
    pub roles: f64,
    pub resources: f64,
    pub activities: f64,
    pub culture: f64,
    pub outputs: f64,
    pub outcomes: f64,
}

impl AlignmentRatings {
    pub const KEYS: [&'static str; 8] = [
        "goals",
        "values",
        "roles",
        "resources",
        "activities",
        "culture",
        "outputs",
        "outcomes",
    ];

    /// The form starts every slider in the middle.
    pub const DEFAULT: AlignmentRatings = AlignmentRatings {
        goals: 0.5,
        values: 0.5,
        roles: 0.5,
        resources: 0.5,
        activities: 0.5,
        culture: 0.5,
        outputs: 0.5,
        outcomes: 0.5,
    };

    pub fn ratings(&self) -> [f64; 8] {
        [
            self.goals,
            self.values,
            self.roles,
            self.resources,
            self.activities,
            self.culture,
            self.outputs,
            self.outcomes,
        ]
    }

    /// Sets a rating by its key. Returns false for an unknown key.
    pub fn set(&mut self, key: &str, value: f64) -> bool {
        let slot = match key.trim().to_lowercase().as_str() {
            "goals" => &mut self.goals,
            "values" => &mut self.values,
            "roles" => &mut self.roles,
            "resources" => &mut self.resources,
            "activities" => &mut self.activities,
            "culture" => &mut self.culture,
            "outputs" => &mut self.outputs,
            "outcomes" => &mut self.outcomes,
            _ => return false,
        };
        *slot = value;
        true
    }

    /// Arithmetic mean of the eight ratings.
    pub fn overall(&self) -> f64 {
        let r = self.ratings();
        r.iter().sum::<f64>() / r.len() as f64
    }

    pub fn validate(&self) -> Result<(), ScoringErrors> {
        for value in self.ratings() {
            validate_alignment(value)?;
        }
        Ok(())
    }
}

/// The score visualisations a respondent asks for.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash, Ord, PartialOrd)]
pub enum ReportSection {
    DirectIndicators,
    ProjectImpact,
    Alignment,
    RippleEffect,
}

impl ReportSection {
    pub const ALL: [ReportSection; 4] = [
        ReportSection::DirectIndicators,
        ReportSection::ProjectImpact,
        ReportSection::Alignment,
        ReportSection::RippleEffect,
    ];

    pub fn title(&self) -> &'static str {
        match self {
            ReportSection::DirectIndicators => "Direct Indicator Scores",
            ReportSection::ProjectImpact => "Project Impact Scores",
            ReportSection::Alignment => "Alignment Scores",
            ReportSection::RippleEffect => "Ripple Effect Scores",
        }
    }

    pub fn from_title(title: &str) -> Option<ReportSection> {
        match title.trim() {
            "Direct Indicator Scores" | "Direct Indicators Scores" => {
                Some(ReportSection::DirectIndicators)
            }
            "Project Impact Scores" => Some(ReportSection::ProjectImpact),
            "Alignment Scores" => Some(ReportSection::Alignment),
            "Ripple Effect Scores" => Some(ReportSection::RippleEffect),
            _ => None,
        }
    }
}

/// Everything a respondent answered, across all the pages of the survey.
#[derive(PartialEq, Debug, Clone)]
pub struct SurveyResponse {
    pub project_id: String,
    pub response_id: String,
    pub project_name: Option<String>,
    pub connection: Option<String>,
    pub alignment: Option<AlignmentRatings>,
    /// Overrides the alignment derived from the ratings.
    pub alignment_score: Option<f64>,
    /// The "describes my project" bucket of each sortable question, in order.
    pub rankings: BTreeMap<Dimension, Vec<String>>,
    pub first_degree: CategoryCounts,
    pub second_degree: CategoryCounts,
    pub third_degree: CategoryCounts,
    pub second_degree_likelihood: GroupLikelihood,
    pub third_degree_likelihood: GroupLikelihood,
    pub selected_scores: Vec<ReportSection>,
}

impl SurveyResponse {
    pub fn ranking(&self, dimension: Dimension) -> &[String] {
        self.rankings
            .get(&dimension)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    /// The explicit alignment score, then the mean of the ratings, then the default of the rules.
    pub fn effective_alignment(&self, rules: &PropagationRules) -> f64 {
        self.alignment_score
            .or_else(|| self.alignment.map(|a| a.overall()))
            .unwrap_or(rules.default_alignment_score)
    }

    pub fn propagation_inputs(&self, rules: &PropagationRules) -> PropagationInputs {
        PropagationInputs {
            first_degree: self.first_degree,
            second_degree: self.second_degree,
            third_degree: self.third_degree,
            second_degree_likelihood: self.second_degree_likelihood,
            third_degree_likelihood: self.third_degree_likelihood,
            alignment_score: self.effective_alignment(rules),
        }
    }

    /// The requested sections, or all of them when none was requested.
    pub fn report_sections(&self) -> Vec<ReportSection> {
        if self.selected_scores.is_empty() {
            ReportSection::ALL.to_vec()
        } else {
            self.selected_scores.clone()
        }
    }
}

/// Collects the answers of a response, page by page, and checks them as they come.
///
/// ```
/// use impact_scoring::builder::Builder;
/// use impact_scoring::catalog::Catalog;
/// use impact_scoring::{Category, Degree, Dimension};
/// # use impact_scoring::ScoringErrors;
///
/// let catalog = Catalog::standard();
/// let mut builder = Builder::new(&catalog).project("P-1", "R-1");
/// builder.add_ranking(Dimension::Duration, &["Multiple Years (1)".to_string()])?;
/// builder.influence(Degree::First, Category::Faculty, 2.0)?;
/// let response = builder.build();
/// assert_eq!(response.ranking(Dimension::Duration).len(), 1);
/// # Ok::<(), ScoringErrors>(())
/// ```
pub struct Builder {
    pub(crate) _catalog: Catalog,
    pub(crate) _response: SurveyResponse,
}

impl Builder {
    pub fn new(catalog: &Catalog) -> Builder {
        Builder {
            _catalog: catalog.clone(),
            _response: SurveyResponse {
                project_id: String::new(),
                response_id: String::new(),
                project_name: None,
                connection: None,
                alignment: None,
                alignment_score: None,
                rankings: BTreeMap::new(),
                first_degree: CategoryCounts::default(),
                second_degree: CategoryCounts::default(),
                third_degree: CategoryCounts::default(),
                second_degree_likelihood: GroupLikelihood::DEFAULT,
                third_degree_likelihood: GroupLikelihood::DEFAULT,
                selected_scores: Vec::new(),
            },
        }
    }

    pub fn project(mut self, project_id: &str, response_id: &str) -> Builder {
        self._response.project_id = project_id.trim().to_string();
        self._response.response_id = response_id.trim().to_string();
        self
    }

    pub fn project_name(mut self, name: &str) -> Builder {
        self._response.project_name = Some(name.to_string());
        self
    }

    pub fn connection(mut self, connection: &str) -> Builder {
        self._response.connection = Some(connection.to_string());
        self
    }

    pub fn alignment(mut self, ratings: AlignmentRatings) -> Result<Builder, ScoringErrors> {
        ratings.validate()?;
        self._response.alignment = Some(ratings);
        Ok(self)
    }

    pub fn alignment_score(mut self, score: f64) -> Result<Builder, ScoringErrors> {
        validate_alignment(score)?;
        self._response.alignment_score = Some(score);
        Ok(self)
    }

    pub fn selected_scores(mut self, sections: &[ReportSection]) -> Builder {
        let mut selected: Vec<ReportSection> = sections.to_vec();
        selected.sort();
        selected.dedup();
        self._response.selected_scores = selected;
        self
    }

    /// Records the "describes my project" bucket of a question.
    ///
    /// Blank labels are dropped. Labels that the question does not know are
    /// kept; they weigh nothing when the ranking is scored.
    pub fn add_ranking(&mut self, dimension: Dimension, items: &[String]) -> Result<(), ScoringErrors> {
        let ranked: Vec<String> = items
            .iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        if let Some(table) = self._catalog.table(dimension) {
            if ranked.len() > table.len() {
                return Err(ScoringErrors::RankingTooLong {
                    dimension,
                    len: ranked.len(),
                    max: table.len(),
                });
            }
            let mut seen: HashSet<String> = HashSet::new();
            for label in ranked.iter() {
                let canonical = table
                    .canonical_label(label)
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| label.clone());
                if !seen.insert(canonical) {
                    return Err(ScoringErrors::DuplicateItem {
                        dimension,
                        label: label.clone(),
                    });
                }
                if table.weight(label).is_none() {
                    debug!(
                        "add_ranking: {:?} is not a statement of {}",
                        label,
                        dimension.title()
                    );
                }
            }
        }
        self._response.rankings.insert(dimension, ranked);
        Ok(())
    }

    pub fn add_ranking_by_key(&mut self, key: &str, items: &[String]) -> Result<(), ScoringErrors> {
        let dimension =
            Dimension::from_key(key).ok_or_else(|| ScoringErrors::UnknownDimension(key.to_string()))?;
        self.add_ranking(dimension, items)
    }

    /// Records a head count as typed in the form.
    pub fn influence(&mut self, degree: Degree, category: Category, raw: f64) -> Result<(), ScoringErrors> {
        let count = parse_count(degree, category, raw)?;
        let counts = match degree {
            Degree::First => &mut self._response.first_degree,
            Degree::Second => &mut self._response.second_degree,
            Degree::Third => &mut self._response.third_degree,
        };
        counts.set(category, count);
        Ok(())
    }

    pub fn influence_by_key(&mut self, degree: Degree, key: &str, raw: f64) -> Result<(), ScoringErrors> {
        let category =
            Category::from_key(key).ok_or_else(|| ScoringErrors::UnknownCategory(key.to_string()))?;
        self.influence(degree, category, raw)
    }

    pub fn second_degree_likelihood(&mut self, within_group: f64, outside_group: f64) -> Result<(), ScoringErrors> {
        let likelihood = GroupLikelihood {
            within_group,
            outside_group,
        };
        likelihood.validate(Degree::Second)?;
        self._response.second_degree_likelihood = likelihood;
        Ok(())
    }

    pub fn third_degree_likelihood(&mut self, within_group: f64, outside_group: f64) -> Result<(), ScoringErrors> {
        let likelihood = GroupLikelihood {
            within_group,
            outside_group,
        };
        likelihood.validate(Degree::Third)?;
        self._response.third_degree_likelihood = likelihood;
        Ok(())
    }

    pub fn build(self) -> SurveyResponse {
        self._response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn rejects_rankings_longer_than_the_question() {
        let catalog = Catalog::standard();
        let mut builder = Builder::new(&catalog);
        let items = labels(&["a", "b", "c", "d", "e"]);
        assert!(builder.add_ranking(Dimension::Integration, &items).is_err());
        assert!(builder.add_ranking(Dimension::Voice, &items).is_ok());
    }

    #[test]
    fn rejects_the_same_statement_twice() {
        let catalog = Catalog::standard();
        let mut builder = Builder::new(&catalog);
        let items = labels(&["Once (0.78)", "Once"]);
        assert_eq!(
            builder.add_ranking(Dimension::Frequency, &items),
            Err(ScoringErrors::DuplicateItem {
                dimension: Dimension::Frequency,
                label: "Once".to_string()
            })
        );
    }

    #[test]
    fn blank_labels_are_dropped() {
        let catalog = Catalog::standard();
        let mut builder = Builder::new(&catalog);
        builder
            .add_ranking(Dimension::Frequency, &labels(&["", "Once (0.78)", "  "]))
            .unwrap();
        let response = builder.build();
        assert_eq!(response.ranking(Dimension::Frequency), &["Once (0.78)".to_string()]);
        assert!(response.ranking(Dimension::Voice).is_empty());
    }

    #[test]
    fn counts_must_be_whole_and_positive() {
        let catalog = Catalog::standard();
        let mut builder = Builder::new(&catalog);
        assert!(builder.influence(Degree::First, Category::Staff, -1.0).is_err());
        assert!(builder.influence(Degree::First, Category::Staff, 2.5).is_err());
        assert!(builder.influence(Degree::First, Category::Staff, f64::NAN).is_err());
        assert!(builder.influence_by_key(Degree::Second, "deans", 1.0).is_err());
        builder.influence(Degree::Third, Category::Staff, 4.0).unwrap();
        assert_eq!(builder.build().third_degree.get(Category::Staff), 4);
    }

    #[test]
    fn likelihoods_are_capped() {
        let catalog = Catalog::standard();
        let mut builder = Builder::new(&catalog);
        assert!(builder.second_degree_likelihood(0.91, 0.1).is_err());
        assert!(builder.third_degree_likelihood(0.1, -0.1).is_err());
        builder.third_degree_likelihood(0.9, 0.0).unwrap();
    }

    #[test]
    fn alignment_falls_back_to_ratings_then_default() {
        let catalog = Catalog::standard();
        let rules = PropagationRules::DEFAULT_RULES;
        let response = Builder::new(&catalog).build();
        assert_eq!(response.effective_alignment(&rules), 0.75);

        let mut ratings = AlignmentRatings::DEFAULT;
        assert!(ratings.set("culture", 0.9));
        assert!(!ratings.set("budget", 0.9));
        let response = Builder::new(&catalog).alignment(ratings).unwrap().build();
        assert!((response.effective_alignment(&rules) - 0.55).abs() < 1e-12);

        let response = Builder::new(&catalog)
            .alignment(ratings)
            .unwrap()
            .alignment_score(0.2)
            .unwrap()
            .build();
        assert_eq!(response.effective_alignment(&rules), 0.2);
        assert!(Builder::new(&catalog).alignment_score(1.2).is_err());
    }

    #[test]
    fn no_selection_means_every_section() {
        let catalog = Catalog::standard();
        let response = Builder::new(&catalog).build();
        assert_eq!(response.report_sections().len(), 4);
        let response = Builder::new(&catalog)
            .selected_scores(&[ReportSection::RippleEffect, ReportSection::Alignment])
            .build();
        assert_eq!(
            response.report_sections(),
            vec![ReportSection::Alignment, ReportSection::RippleEffect]
        );
    }
}
