//! The statements of every sortable question, with their weights.

use std::collections::BTreeMap;

use crate::config::*;

/// The weight tables of all the dimensions of a survey.
#[derive(PartialEq, Debug, Clone)]
pub struct Catalog {
    tables: BTreeMap<Dimension, WeightTable>,
}

impl Catalog {
    pub fn new(tables: BTreeMap<Dimension, WeightTable>) -> Catalog {
        Catalog { tables }
    }

    /// The questions of the deployed survey.
    pub fn standard() -> Catalog {
        let mut tables: BTreeMap<Dimension, WeightTable> = BTreeMap::new();
        for dimension in Dimension::ALL {
            let pairs = standard_items(dimension);
            let items = pairs
                .iter()
                .map(|(label, weight)| WeightedItem {
                    label: label.to_string(),
                    weight: *weight,
                })
                .collect();
            // The standard weights are all taken from ALLOWED_WEIGHTS.
            tables.insert(dimension, WeightTable { items });
        }
        Catalog::new(tables)
    }

    pub fn table(&self, dimension: Dimension) -> Option<&WeightTable> {
        self.tables.get(&dimension)
    }

    pub fn dimensions(&self) -> impl Iterator<Item = &Dimension> {
        self.tables.keys()
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Catalog::standard()
    }
}

fn standard_items(dimension: Dimension) -> &'static [(&'static str, f64)] {
    match dimension {
        Dimension::ChallengeOrigin => &[
            ("The Research Team identified the challenge or issue (0.78)", 0.78),
            ("The Community identified the challenge or issue (0.95)", 0.95),
            ("There were ongoing negotiations between the Research Team and the Community (1)", 1.00),
            ("The Research Team refined the challenge or issue (0.84)", 0.84),
            ("The Community refined the challenge or issue (0.90)", 0.90),
        ],
        Dimension::Diversity => &[
            ("The Research Team is diverse in multiple ways and represents a range of identities (0.78)", 0.78),
            ("The Community is diverse in multiple ways and represents a range of identities (0.84)", 0.84),
            ("Underrepresented and/or marginalized identities are a part of the Research Team (0.90)", 0.90),
            ("Underrepresented and/or marginalized identities are a part of the Community (0.95)", 0.95),
            ("There are overlaps in identity memberships between the Research Team and the Community (1)", 1.00),
        ],
        Dimension::Resources => &[
            ("All resources were provided by the Research Team (0.84)", 0.84),
            ("The Research Team contributed resources (0.90)", 0.90),
            ("There were ongoing negotiations between the Research Team and the Community about the commitment of resources (1)", 1.00),
            ("The Community contributed resources (0.95)", 0.95),
            ("All resources were provided by the Community (0.78)", 0.78),
        ],
        Dimension::Trust => &[
            ("Despite a history of mistrust, the Research Team reached out to the Community (0.90)", 0.90),
            ("Building on a history of trust and collaboration, the Research Team reached out to the Community (0.78)", 0.78),
            ("There were ongoing trust-building efforts between the Research Institution and the Community (1)", 1.00),
            ("Building on a history of trust and collaboration, the Community reached out to the Research Team (0.84)", 0.84),
            ("Despite a history of mistrust, the Community reached out to the Research Team (0.95)", 0.95),
        ],
        Dimension::Beneficence => &[
            ("The Research Team benefitted from the processes (0.78)", 0.78),
            ("The Community Partners benefitted from the processes (0.90)", 0.90),
            ("There were ongoing discussions to ensure both the Community and the Research Team would benefit (1)", 1.00),
            ("Benefits built upon and strengthened the Community’s cultural capital and wealth and agency (0.95)", 0.95),
            ("Benefits aligned with the goals and purposes of the project (0.84)", 0.84),
        ],
        Dimension::Reflection => &[
            ("The Research Team engaged in and benefitted from intentional reflection activities (0.78)", 0.78),
            ("Community partners engaged in and benefitted from intentional reflection activities (0.84)", 0.84),
            ("The Research Team and Community partners engaged in and benefitted from intentional collaborative reflection activities (1)", 1.00),
            ("Lessons learned for all participants were identified through intentional reflection activities (0.90)", 0.90),
            ("Strategies and new practices were developed through intentional reflection activities (0.95)", 0.95),
        ],
        Dimension::DecisionMaking => &[
            ("The Research Team contributed to the decision making processes (0.78)", 0.78),
            ("Community Partners contributed to the decision making processes (0.84)", 0.84),
            ("Decision making was conducted through clear and understood processes (1)", 1.00),
            ("Decision making processes recognized and supported the community’s cultural capital and agency (0.95)", 0.95),
            ("Decisions were made to align with the goals and purposes of the project (0.90)", 0.90),
        ],
        Dimension::ToolConstruction => &[
            ("Promoted Efficiency (0.84)", 0.84),
            ("The Research Team contributed to building the tools (0.78)", 0.78),
            ("Recognized and supported the Community’s cultural wealth and capital and agency (1)", 1.00),
            ("Made processes more clear and understandable (0.95)", 0.95),
            ("The Community contributed to building the tools (0.90)", 0.90),
        ],
        Dimension::Duration => &[
            ("A Week or Less (0.78)", 0.78),
            ("A Month or Less (0.84)", 0.84),
            ("A Semester or Less (0.90)", 0.90),
            ("A Year or Less (0.95)", 0.95),
            ("Multiple Years (1)", 1.00),
        ],
        Dimension::Frequency => &[
            ("Once (0.78)", 0.78),
            ("More than once (0.84)", 0.84),
            ("At least Monthly (0.90)", 0.90),
            ("At least Weekly (0.95)", 0.95),
            ("Daily or more (1)", 1.00),
        ],
        Dimension::ResearchQuestions => &[
            ("The Research Team contributed to the research question or questions to be explored (0.78)", 0.78),
            ("The Community contributed to the research question or questions to be explored (0.95)", 0.95),
            ("The research question or questions recognized and supported the Community’s cultural wealth and capital and agency (0.90)", 0.90),
            ("The research question or questions were designed to align with the goals and purposes of the project (0.84)", 0.84),
            ("The research question or questions provided opportunities to generate new understandings for the discipline(s) of the Research Team and to benefit the Community (1)", 1.00),
        ],
        Dimension::DesignFacilitation => &[
            ("The Research Team contributed to the design and facilitation of interventions and research (0.78)", 0.78),
            ("The Community contributed to the design and facilitation of interventions and research (0.95)", 0.95),
            ("The design and facilitation of interventions and research recognized and supported the Community’s cultural wealth and capital and agency (0.90)", 0.90),
            ("The design and facilitation of interventions and research aligned with the goals and purposes of the project (0.84)", 0.84),
            ("The design and facilitation of interventions and research provided opportunities to generate new understandings for the discipline(s) and to benefit the Community (1)", 1.00),
        ],
        Dimension::Voice => &[
            ("Materials and Events utilized Academic Language (0.78)", 0.78),
            ("Materials and Events utilized Community-Centered Language (0.90)", 0.90),
            ("Materials and Events were aligned with the goals and purposes of the project (0.84)", 0.84),
            ("Materials and Events were fit specifically for local settings (0.95)", 0.95),
            ("Materials and Events were culture-centered activities (1)", 1.00),
        ],
        Dimension::Reciprocity => &[
            ("Expectations around Community benefit and Student learning are included in the course syllabus (0.78)", 0.78),
            ("Student accountability to the Community and Community benefit are shared with Students (0.84)", 0.84),
            ("The Instructor facilitates an activity or activities that benefit the Community and enrich Student learning (0.9)", 0.90),
            ("Activities are co-constructed by the Instructor, Community, and Students that benefit the Community and enrich Student learning (0.95)", 0.95),
            ("There is ongoing collaboration between the Community, the Instructor, and Students in all phases of the project or engaged experience (1)", 1.00),
        ],
        Dimension::CivicLearning => &[
            ("Civic learning expectations and outcomes are included in the course syllabus (0.78)", 0.78),
            ("There is an alignment across the syllabus, the activities, and the assessments to ensure civic learning is a measured component of the course (0.9)", 0.90),
            ("Course and community activities are facilitated to support civic learning (0.84)", 0.84),
            ("Opportunities are offered for meaning-making and making connections between civic learning and academic work in the course (0.95)", 0.95),
            ("Opportunities are offered for meaning-making and making connections between civic learning and real-world contexts (1)", 1.00),
        ],
        Dimension::CriticalReflection => &[
            ("Expectations for critical reflection is built into the course requirements and are stated in the syllabus (0.78)", 0.78),
            ("There are ongoing critical reflection activities with scaffolding that allow deepened reflections on engaged experiences (0.84)", 0.84),
            ("Critical reflection activities are offered that help students make connections across course content and beyond (1)", 1.00),
            ("Critical reflection activities are used to enhance course content (0.95)", 0.95),
            ("Critical reflection activities are used to deepen collaborative relationships with the Community (1)", 1.00),
        ],
        Dimension::Integration => &[
            ("Relationships and dynamics between the Instructor, the Community, and the Students are similar to the relationships and dynamics of the broader research project (0.84)", 0.84),
            ("The Community is included in the decision making around the inclusion of engaged learning in the broader research project (0.9)", 0.90),
            ("Students’ engagement activities with the Community support research and intervention activities by building capacities and capabilities and/or generating useful understandings and/or practices (0.95)", 0.95),
            ("Course artifacts and outputs support research and intervention activities by building capacities and capabilities and/or generating useful understandings and/or practices (1)", 1.00),
        ],
        Dimension::GoalsMet => &[
            ("Entirely for the Research Team (1)", 1.00),
            ("Mostly for the Research Team, some for the Community (0.95)", 0.95),
            ("Equally for the Research Team and the Community (0.90)", 0.90),
            ("Mostly for the Community, some for the Research Team (0.84)", 0.84),
            ("Entirely for the Community (0.78)", 0.78),
        ],
        Dimension::OutputsDelivered => &[
            ("Academic Outputs that Benefit the Research Team (0.78)", 0.78),
            ("Academic Outputs that Advance the Field (0.84)", 0.84),
            ("Community-Based Outputs that Benefit Direct Community Partners (0.90)", 0.90),
            ("Community-Based Outputs that Reach Broader Community Members and Institutions (1)", 1.00),
            ("Academic and/or Community-Based Outputs in a Range of Venues (0.95)", 0.95),
        ],
        Dimension::CapacitiesCapabilities => &[
            ("Participant and/or Community well-being (0.90)", 0.90),
            ("Participant and/or Community agency (1)", 1.00),
            ("Mutual trust and respect between the Community and the Research Team and/or the Research Institution (0.78)", 0.78),
            ("The distribution of opportunity and/or attainment (0.84)", 0.84),
            ("The fabric and cohesion of the Community (0.95)", 0.95),
        ],
        Dimension::Sustainability => &[
            ("Trust and respect in partnership (0.84)", 0.84),
            ("Available resources (0.78)", 0.78),
            ("Ongoing shared vision and common goals (1)", 1.00),
            ("Concrete strategies for further engagement (0.90)", 0.90),
            ("Infrastructures for further engagement (0.95)", 0.95),
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_dimension_has_a_table() {
        let catalog = Catalog::standard();
        for d in Dimension::ALL {
            let table = catalog.table(d).unwrap();
            let expected = if d == Dimension::Integration { 4 } else { 5 };
            assert_eq!(table.len(), expected, "{:?}", d);
        }
    }

    #[test]
    fn standard_weights_are_allowed() {
        let catalog = Catalog::standard();
        for d in Dimension::ALL {
            let table = catalog.table(d).unwrap();
            assert!(WeightTable::new(table.items().to_vec()).is_ok(), "{:?}", d);
        }
    }

    #[test]
    fn labels_match_with_or_without_displayed_weight() {
        let catalog = Catalog::standard();
        let table = catalog.table(Dimension::Duration).unwrap();
        assert_eq!(table.weight("Multiple Years (1)"), Some(1.00));
        assert_eq!(table.weight("Multiple Years"), Some(1.00));
        assert_eq!(table.weight("  A Week or Less (0.78) "), Some(0.78));
        assert_eq!(table.weight("Forever"), None);
    }

    #[test]
    fn partial_catalog() {
        let standard = Catalog::standard();
        let mut tables = BTreeMap::new();
        for d in [Dimension::Voice, Dimension::Duration] {
            tables.insert(d, standard.table(d).unwrap().clone());
        }
        let catalog = Catalog::new(tables);
        let dims: Vec<Dimension> = catalog.dimensions().cloned().collect();
        assert_eq!(dims, vec![Dimension::Duration, Dimension::Voice]);
        assert!(catalog.table(Dimension::Trust).is_none());
        assert_eq!(standard.dimensions().count(), Dimension::ALL.len());
    }

    #[test]
    fn every_dimension_but_voice_has_one_composite() {
        for d in Dimension::ALL {
            let owners: Vec<Composite> = Composite::ALL
                .iter()
                .filter(|c| c.dimensions().contains(&d))
                .cloned()
                .collect();
            match d.composite() {
                Some(c) => assert_eq!(owners, vec![c], "{:?}", d),
                None => {
                    assert_eq!(d, Dimension::Voice);
                    assert!(owners.is_empty());
                }
            }
        }
        assert_eq!(
            Dimension::Frequency.composite(),
            Some(Composite::InterventionsAndResearch)
        );
    }

    #[test]
    fn category_names_in_singular_or_plural() {
        assert_eq!(Category::from_key("student"), Some(Category::Student));
        assert_eq!(Category::from_key("students"), Some(Category::Student));
        assert_eq!(
            Category::from_key("student-assistant"),
            Some(Category::StudentAssistant)
        );
        assert_eq!(
            Category::from_key("core-community-member"),
            Some(Category::CoreCommunityMember)
        );
        assert_eq!(
            Category::from_key("community-institution-representative"),
            Some(Category::CommunityInstitutionRepresentative)
        );
        assert_eq!(
            Category::from_key("community_institution"),
            Some(Category::CommunityInstitutionRepresentative)
        );
        assert_eq!(Category::from_key("Faculty"), Some(Category::Faculty));
        assert_eq!(Category::from_key("visitors"), None);
        for c in Category::ALL {
            assert_eq!(Category::from_key(c.key()), Some(c));
        }
    }

    #[test]
    fn short_weight_suffix_still_carries_its_weight() {
        let catalog = Catalog::standard();
        let table = catalog.table(Dimension::Reciprocity).unwrap();
        let label = "The Instructor facilitates an activity or activities that benefit the Community and enrich Student learning (0.9)";
        assert_eq!(table.weight(label), Some(0.90));
    }
}
