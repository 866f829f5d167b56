// ********* Input data structures ***********

use std::error::Error;
use std::fmt::Display;

/// The only weights a survey item may carry.
pub const ALLOWED_WEIGHTS: [f64; 5] = [1.00, 0.95, 0.90, 0.84, 0.78];

/// A statement of a sortable question, with the weight fixed when the
/// question was designed.
#[derive(PartialEq, Debug, Clone)]
pub struct WeightedItem {
    pub label: String,
    pub weight: f64,
}

/// The statements of one dimension.
///
/// Labels are matched exactly (after trimming) or by their stem, which is the
/// label without the weight that the form displays at the end, for example
/// `Multiple Years (1)` and `Multiple Years` both match the same item.
#[derive(PartialEq, Debug, Clone)]
pub struct WeightTable {
    pub(crate) items: Vec<WeightedItem>,
}

impl WeightTable {
    pub fn new(items: Vec<WeightedItem>) -> Result<WeightTable, ScoringErrors> {
        for item in items.iter() {
            if !ALLOWED_WEIGHTS.iter().any(|w| *w == item.weight) {
                return Err(ScoringErrors::InvalidWeight {
                    label: item.label.clone(),
                    weight: item.weight,
                });
            }
        }
        Ok(WeightTable { items })
    }

    /// Builds a table from `(label, weight)` pairs.
    pub fn from_pairs(pairs: &[(&str, f64)]) -> Result<WeightTable, ScoringErrors> {
        WeightTable::new(
            pairs
                .iter()
                .map(|(label, weight)| WeightedItem {
                    label: label.to_string(),
                    weight: *weight,
                })
                .collect(),
        )
    }

    pub fn items(&self) -> &[WeightedItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// The weight of a label, if the label belongs to this table.
    pub fn weight(&self, label: &str) -> Option<f64> {
        let label = label.trim();
        if let Some(item) = self.items.iter().find(|item| item.label.trim() == label) {
            return Some(item.weight);
        }
        let stem = label_stem(label);
        self.items
            .iter()
            .find(|item| label_stem(item.label.trim()) == stem)
            .map(|item| item.weight)
    }

    /// The canonical label of the item matched by `label`.
    pub fn canonical_label(&self, label: &str) -> Option<&str> {
        let stem = label_stem(label.trim());
        self.items
            .iter()
            .find(|item| label_stem(item.label.trim()) == stem)
            .map(|item| item.label.as_str())
    }
}

/// Removes a trailing parenthesised number, as in `Once (0.78)`.
pub fn label_stem(label: &str) -> &str {
    if let Some(stripped) = label.strip_suffix(')') {
        if let Some(open) = stripped.rfind('(') {
            let inner = &stripped[open + 1..];
            if !inner.is_empty() && inner.parse::<f64>().is_ok() {
                return stripped[..open].trim_end();
            }
        }
    }
    label
}

/// The topics of the sortable questions.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash, Ord, PartialOrd)]
pub enum Dimension {
    ChallengeOrigin,
    Diversity,
    Resources,
    Trust,
    Beneficence,
    Reflection,
    DecisionMaking,
    ToolConstruction,
    Duration,
    Frequency,
    ResearchQuestions,
    DesignFacilitation,
    Voice,
    Reciprocity,
    CivicLearning,
    CriticalReflection,
    Integration,
    GoalsMet,
    OutputsDelivered,
    CapacitiesCapabilities,
    Sustainability,
}

impl Dimension {
    pub const ALL: [Dimension; 21] = [
        Dimension::ChallengeOrigin,
        Dimension::Diversity,
        Dimension::Resources,
        Dimension::Trust,
        Dimension::Beneficence,
        Dimension::Reflection,
        Dimension::DecisionMaking,
        Dimension::ToolConstruction,
        Dimension::Duration,
        Dimension::Frequency,
        Dimension::ResearchQuestions,
        Dimension::DesignFacilitation,
        Dimension::Voice,
        Dimension::Reciprocity,
        Dimension::CivicLearning,
        Dimension::CriticalReflection,
        Dimension::Integration,
        Dimension::GoalsMet,
        Dimension::OutputsDelivered,
        Dimension::CapacitiesCapabilities,
        Dimension::Sustainability,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            Dimension::ChallengeOrigin => "challenge_origin",
            Dimension::Diversity => "diversity",
            Dimension::Resources => "resources",
            Dimension::Trust => "trust",
            Dimension::Beneficence => "beneficence",
            Dimension::Reflection => "reflection",
            Dimension::DecisionMaking => "decision_making",
            Dimension::ToolConstruction => "tool_construction",
            Dimension::Duration => "duration",
            Dimension::Frequency => "frequency",
            Dimension::ResearchQuestions => "research_questions",
            Dimension::DesignFacilitation => "design_facilitation",
            Dimension::Voice => "voice",
            Dimension::Reciprocity => "reciprocity",
            Dimension::CivicLearning => "civic_learning",
            Dimension::CriticalReflection => "critical_reflection",
            Dimension::Integration => "integration",
            Dimension::GoalsMet => "goals_met",
            Dimension::OutputsDelivered => "outputs_delivered",
            Dimension::CapacitiesCapabilities => "capacities_capabilities",
            Dimension::Sustainability => "sustainability",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Dimension::ChallengeOrigin => "Challenge Origin",
            Dimension::Diversity => "Diversity",
            Dimension::Resources => "Resources",
            Dimension::Trust => "Trust",
            Dimension::Beneficence => "Beneficence",
            Dimension::Reflection => "Reflection",
            Dimension::DecisionMaking => "Decision Making",
            Dimension::ToolConstruction => "Tool Construction",
            Dimension::Duration => "Duration",
            Dimension::Frequency => "Frequency",
            Dimension::ResearchQuestions => "Research Questions",
            Dimension::DesignFacilitation => "Design and Facilitation",
            Dimension::Voice => "Voice",
            Dimension::Reciprocity => "Reciprocity",
            Dimension::CivicLearning => "Civic Learning",
            Dimension::CriticalReflection => "Critical Reflection",
            Dimension::Integration => "Integration",
            Dimension::GoalsMet => "Goals Met",
            Dimension::OutputsDelivered => "Outputs Delivered",
            Dimension::CapacitiesCapabilities => "Capacities and Capabilities Strengthened",
            Dimension::Sustainability => "Sustainability",
        }
    }

    /// Accepts the snake_case key, or the same key written with dashes.
    pub fn from_key(key: &str) -> Option<Dimension> {
        let normalized = key.trim().replace('-', "_").to_lowercase();
        Dimension::ALL
            .iter()
            .find(|d| d.key() == normalized)
            .cloned()
    }

    /// The composite this dimension contributes to. Voice is reported on its own.
    pub fn composite(&self) -> Option<Composite> {
        Composite::ALL
            .iter()
            .find(|c| c.dimensions().contains(self))
            .cloned()
    }
}

/// The five macro categories of the impact profile.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash, Ord, PartialOrd)]
pub enum Composite {
    Context,
    Processes,
    InterventionsAndResearch,
    EngagedLearners,
    Outcomes,
}

impl Composite {
    pub const ALL: [Composite; 5] = [
        Composite::Context,
        Composite::Processes,
        Composite::InterventionsAndResearch,
        Composite::EngagedLearners,
        Composite::Outcomes,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            Composite::Context => "context",
            Composite::Processes => "processes",
            Composite::InterventionsAndResearch => "interventions_and_research",
            Composite::EngagedLearners => "engaged_learners",
            Composite::Outcomes => "outcomes",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Composite::Context => "Context",
            Composite::Processes => "Processes",
            Composite::InterventionsAndResearch => "Interventions and Research",
            Composite::EngagedLearners => "Engaged Learners",
            Composite::Outcomes => "Outcomes",
        }
    }

    pub fn dimensions(&self) -> [Dimension; 4] {
        match self {
            Composite::Context => [
                Dimension::ChallengeOrigin,
                Dimension::Diversity,
                Dimension::Trust,
                Dimension::Resources,
            ],
            Composite::Processes => [
                Dimension::Beneficence,
                Dimension::Reflection,
                Dimension::DecisionMaking,
                Dimension::ToolConstruction,
            ],
            Composite::InterventionsAndResearch => [
                Dimension::Duration,
                Dimension::Frequency,
                Dimension::ResearchQuestions,
                Dimension::DesignFacilitation,
            ],
            Composite::EngagedLearners => [
                Dimension::Reciprocity,
                Dimension::CivicLearning,
                Dimension::CriticalReflection,
                Dimension::Integration,
            ],
            Composite::Outcomes => [
                Dimension::GoalsMet,
                Dimension::OutputsDelivered,
                Dimension::CapacitiesCapabilities,
                Dimension::Sustainability,
            ],
        }
    }
}

/// The groups of people counted in the influence questions.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash, Ord, PartialOrd)]
pub enum Category {
    Faculty,
    Staff,
    StudentAssistant,
    Student,
    CoreCommunityMember,
    CommunityInstitutionRepresentative,
}

impl Category {
    pub const ALL: [Category; 6] = [
        Category::Faculty,
        Category::Staff,
        Category::StudentAssistant,
        Category::Student,
        Category::CoreCommunityMember,
        Category::CommunityInstitutionRepresentative,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            Category::Faculty => "faculty",
            Category::Staff => "staff",
            Category::StudentAssistant => "student_assistants",
            Category::Student => "students",
            Category::CoreCommunityMember => "core_community_members",
            Category::CommunityInstitutionRepresentative => "community_institution",
        }
    }

    /// Accepts the plural key, the singular name of the group, and both
    /// written with dashes.
    pub fn from_key(key: &str) -> Option<Category> {
        let normalized = key.trim().replace('-', "_").to_lowercase();
        match normalized.as_str() {
            "student" => Some(Category::Student),
            "student_assistant" => Some(Category::StudentAssistant),
            "core_community_member" => Some(Category::CoreCommunityMember),
            "community_institution_representative"
            | "community_institution_representatives" => {
                Some(Category::CommunityInstitutionRepresentative)
            }
            _ => Category::ALL
                .iter()
                .find(|c| c.key() == normalized)
                .cloned(),
        }
    }

    fn index(&self) -> usize {
        Category::ALL
            .iter()
            .position(|c| c == self)
            .unwrap_or_default()
    }
}

/// The degree of separation from the project a question is about.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash, Ord, PartialOrd)]
pub enum Degree {
    First,
    Second,
    Third,
}

impl Degree {
    pub fn layer(&self) -> u32 {
        match self {
            Degree::First => 1,
            Degree::Second => 2,
            Degree::Third => 3,
        }
    }
}

/// A non-negative head count per category.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Default)]
pub struct CategoryCounts([u64; 6]);

impl CategoryCounts {
    pub fn new(counts: [u64; 6]) -> CategoryCounts {
        CategoryCounts(counts)
    }

    pub fn get(&self, category: Category) -> u64 {
        self.0[category.index()]
    }

    pub fn set(&mut self, category: Category, count: u64) {
        self.0[category.index()] = count;
    }

    pub fn total(&self) -> u64 {
        self.0.iter().sum()
    }
}

/// Checks a count as it is typed in a form (a float) and turns it into a head count.
pub fn parse_count(degree: Degree, category: Category, raw: f64) -> Result<u64, ScoringErrors> {
    if !raw.is_finite() || raw < 0.0 || raw.fract() != 0.0 || raw > u64::MAX as f64 {
        return Err(ScoringErrors::InvalidCount {
            degree,
            category,
            value: raw,
        });
    }
    Ok(raw as u64)
}

/// How likely people influenced by the same person know each other, and how
/// likely they know someone from another group.
#[derive(PartialEq, Debug, Clone, Copy)]
pub struct GroupLikelihood {
    pub within_group: f64,
    pub outside_group: f64,
}

impl GroupLikelihood {
    /// Form default.
    pub const DEFAULT: GroupLikelihood = GroupLikelihood {
        within_group: 0.5,
        outside_group: 0.5,
    };

    /// Highest value the form allows.
    pub const MAX: f64 = 0.90;

    pub fn validate(&self, degree: Degree) -> Result<(), ScoringErrors> {
        for value in [self.within_group, self.outside_group] {
            if !value.is_finite() || !(0.0..=GroupLikelihood::MAX).contains(&value) {
                return Err(ScoringErrors::LikelihoodOutOfRange { degree, value });
            }
        }
        Ok(())
    }
}

/// The raw inputs of the ripple-effect computation.
#[derive(PartialEq, Debug, Clone)]
pub struct PropagationInputs {
    pub first_degree: CategoryCounts,
    pub second_degree: CategoryCounts,
    pub third_degree: CategoryCounts,
    pub second_degree_likelihood: GroupLikelihood,
    pub third_degree_likelihood: GroupLikelihood,
    pub alignment_score: f64,
}

impl PropagationInputs {
    /// Number of nodes the constructed graph will hold, root included.
    /// `None` on overflow.
    pub fn projected_node_count(&self) -> Option<u64> {
        if self.first_degree.total() == 0 {
            return Some(0);
        }
        let mut total: u64 = 1;
        for c in Category::ALL {
            let first = self.first_degree.get(c);
            let second = first.checked_mul(self.second_degree.get(c))?;
            let third = second.checked_mul(self.third_degree.get(c))?;
            total = total
                .checked_add(first)?
                .checked_add(second)?
                .checked_add(third)?;
        }
        Some(total)
    }

    pub fn validate(&self, rules: &PropagationRules) -> Result<(), ScoringErrors> {
        self.second_degree_likelihood.validate(Degree::Second)?;
        self.third_degree_likelihood.validate(Degree::Third)?;
        validate_alignment(self.alignment_score)?;
        match self.projected_node_count() {
            Some(n) if n <= rules.max_nodes as u64 => Ok(()),
            _ => Err(ScoringErrors::GraphTooLarge {
                max_nodes: rules.max_nodes,
            }),
        }
    }
}

pub fn validate_alignment(value: f64) -> Result<(), ScoringErrors> {
    if !value.is_finite() || !(0.0..=1.0).contains(&value) {
        return Err(ScoringErrors::AlignmentOutOfRange { value });
    }
    Ok(())
}

// ******** Errors *********

/// Errors that prevent a response from being scored.
///
/// They are all raised when the response is checked. Scoring itself never fails.
#[derive(PartialEq, Debug, Clone)]
pub enum ScoringErrors {
    InvalidWeight {
        label: String,
        weight: f64,
    },
    UnknownDimension(String),
    UnknownCategory(String),
    RankingTooLong {
        dimension: Dimension,
        len: usize,
        max: usize,
    },
    DuplicateItem {
        dimension: Dimension,
        label: String,
    },
    InvalidCount {
        degree: Degree,
        category: Category,
        value: f64,
    },
    LikelihoodOutOfRange {
        degree: Degree,
        value: f64,
    },
    AlignmentOutOfRange {
        value: f64,
    },
    GraphTooLarge {
        max_nodes: usize,
    },
    InvalidEdge {
        from: String,
        to: String,
    },
}

impl Error for ScoringErrors {}

impl Display for ScoringErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScoringErrors::InvalidWeight { label, weight } => {
                write!(f, "item {:?} has weight {} which is not allowed", label, weight)
            }
            ScoringErrors::UnknownDimension(s) => write!(f, "unknown dimension {:?}", s),
            ScoringErrors::UnknownCategory(s) => write!(f, "unknown category {:?}", s),
            ScoringErrors::RankingTooLong {
                dimension,
                len,
                max,
            } => write!(
                f,
                "{} ranking has {} items but the question only has {}",
                dimension.title(),
                len,
                max
            ),
            ScoringErrors::DuplicateItem { dimension, label } => {
                write!(f, "{} ranking lists {:?} twice", dimension.title(), label)
            }
            ScoringErrors::InvalidCount {
                degree,
                category,
                value,
            } => write!(
                f,
                "layer {} count for {} must be a non-negative integer, got {}",
                degree.layer(),
                category.key(),
                value
            ),
            ScoringErrors::LikelihoodOutOfRange { degree, value } => write!(
                f,
                "layer {} likelihood must be between 0 and {}, got {}",
                degree.layer(),
                GroupLikelihood::MAX,
                value
            ),
            ScoringErrors::AlignmentOutOfRange { value } => {
                write!(f, "alignment must be between 0 and 1, got {}", value)
            }
            ScoringErrors::GraphTooLarge { max_nodes } => {
                write!(f, "the influence network would exceed {} nodes", max_nodes)
            }
            ScoringErrors::InvalidEdge { from, to } => {
                write!(f, "invalid edge {:?} -> {:?}", from, to)
            }
        }
    }
}

// ********* Configuration **********

#[derive(PartialEq, Debug, Clone, Copy)]
pub struct ScoringRules {
    /// Divides the weighted sum of a ranking. Chosen so that a full ranking
    /// in the ideal order lands close to 1.
    pub normalization_constant: f64,
    /// Fraction of the weight lost per rank.
    pub position_decay: f64,
}

impl ScoringRules {
    pub const DEFAULT_RULES: ScoringRules = ScoringRules {
        normalization_constant: 4.027,
        position_decay: 0.05,
    };
}

/// Which edges count for the diffusion degree.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum NeighborMode {
    All,
    Out,
    In,
}

#[derive(PartialEq, Debug, Clone)]
pub struct PropagationRules {
    pub damping_factor: f64,
    pub max_iterations: usize,
    pub tolerance: f64,
    /// Discount of layers 1, 2 and 3. Any other layer is discounted to 0.
    pub layer_discounts: [f64; 3],
    pub diffusion_mode: NeighborMode,
    pub diffusion_lambda: f64,
    /// Used when a response carries neither an alignment score nor alignment ratings.
    pub default_alignment_score: f64,
    pub max_nodes: usize,
}

impl PropagationRules {
    pub const DEFAULT_RULES: PropagationRules = PropagationRules {
        damping_factor: 0.85,
        max_iterations: 100,
        tolerance: 1e-10,
        layer_discounts: [0.110, 0.051, 0.049],
        diffusion_mode: NeighborMode::All,
        diffusion_lambda: 1.0,
        default_alignment_score: 0.75,
        max_nodes: 250_000,
    };

    pub fn layer_discount(&self, layer: u32) -> f64 {
        match layer {
            1..=3 => self.layer_discounts[(layer - 1) as usize],
            _ => 0.0,
        }
    }
}
