use crate::survey::*;

use serde::{Deserialize, Serialize};
use serde_json::Value as JSValue;

#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct OutputSettings {
    #[serde(rename = "projectName")]
    pub project_name: String,
    #[serde(rename = "outputDirectory")]
    pub output_directory: Option<String>,
}

#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(rename = "projectName")]
    pub project_name: String,
    pub sources: Vec<String>,
    #[serde(rename = "normalizationConstant")]
    pub normalization_constant: String,
    #[serde(rename = "positionDecay")]
    pub position_decay: String,
    #[serde(rename = "dampingFactor")]
    pub damping_factor: String,
}

#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct FileSource {
    pub provider: String,
    #[serde(rename = "filePath")]
    pub file_path: String,
    #[serde(rename = "excelWorksheetName")]
    pub excel_worksheet_name: Option<String>,
    /// Used for the responses that carry neither an alignment score nor alignment ratings.
    #[serde(rename = "alignmentScore")]
    pub alignment_score: Option<f64>,
}

#[derive(PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
pub struct SurveyRules {
    #[serde(rename = "normalizationConstant")]
    pub normalization_constant: Option<f64>,
    #[serde(rename = "positionDecay")]
    pub position_decay: Option<f64>,
    #[serde(rename = "dampingFactor")]
    pub damping_factor: Option<f64>,
    #[serde(rename = "maxIterations")]
    pub max_iterations: Option<JSValue>,
    #[serde(rename = "layerDiscounts")]
    pub layer_discounts: Option<Vec<f64>>,
    #[serde(rename = "diffusionMode")]
    pub diffusion_mode: Option<String>,
    #[serde(rename = "defaultAlignmentScore")]
    pub default_alignment_score: Option<f64>,
    #[serde(rename = "maxNodes")]
    pub max_nodes: Option<JSValue>,
}

#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct StoreSettings {
    #[serde(rename = "filePath")]
    pub file_path: String,
}

#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct SurveyConfig {
    #[serde(rename = "outputSettings")]
    pub output_settings: OutputSettings,
    #[serde(rename = "responseSources")]
    pub response_sources: Vec<FileSource>,
    #[serde(default)]
    pub rules: SurveyRules,
    pub store: Option<StoreSettings>,
}

impl SurveyRules {
    pub fn scoring_rules(&self) -> SurveyResult<ScoringRules> {
        let defaults = ScoringRules::DEFAULT_RULES;
        let res = ScoringRules {
            normalization_constant: self
                .normalization_constant
                .unwrap_or(defaults.normalization_constant),
            position_decay: self.position_decay.unwrap_or(defaults.position_decay),
        };
        ensure_whatever!(
            res.normalization_constant.is_finite() && res.normalization_constant > 0.0,
            "normalizationConstant must be positive, got {}",
            res.normalization_constant
        );
        ensure_whatever!(
            res.position_decay.is_finite() && res.position_decay >= 0.0,
            "positionDecay must be non-negative, got {}",
            res.position_decay
        );
        Ok(res)
    }

    pub fn propagation_rules(&self) -> SurveyResult<PropagationRules> {
        let mut res = PropagationRules::DEFAULT_RULES;
        if let Some(d) = self.damping_factor {
            ensure_whatever!(
                (0.0..1.0).contains(&d),
                "dampingFactor must be in [0, 1), got {}",
                d
            );
            res.damping_factor = d;
        }
        if self.max_iterations.is_some() {
            res.max_iterations = read_js_int(&self.max_iterations)?;
        }
        if let Some(discounts) = &self.layer_discounts {
            match discounts.as_slice() {
                [a, b, c] => res.layer_discounts = [*a, *b, *c],
                _ => whatever!(
                    "layerDiscounts must have 3 values, got {}",
                    discounts.len()
                ),
            }
        }
        if let Some(mode) = &self.diffusion_mode {
            res.diffusion_mode = match mode.as_str() {
                "all" => NeighborMode::All,
                "out" => NeighborMode::Out,
                "in" => NeighborMode::In,
                x => whatever!("unknown diffusion mode: {}", x),
            };
        }
        if let Some(a) = self.default_alignment_score {
            validate_alignment(a).context(InvalidRulesSnafu {})?;
            res.default_alignment_score = a;
        }
        if self.max_nodes.is_some() {
            res.max_nodes = read_js_int(&self.max_nodes)?;
        }
        Ok(res)
    }
}

pub fn read_config(path: &str) -> SurveyResult<SurveyConfig> {
    let config_str = fs::read_to_string(path).context(OpeningJsonSnafu { path })?;
    let config: SurveyConfig = serde_json::from_str(&config_str).context(ParsingJsonSnafu {})?;
    Ok(config)
}

pub fn read_summary(path: String) -> SurveyResult<JSValue> {
    let contents = fs::read_to_string(path.clone()).context(OpeningJsonSnafu { path })?;
    let js: JSValue = serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu {})?;
    Ok(js)
}

fn read_js_int(x: &Option<JSValue>) -> SurveyResult<usize> {
    match x {
        Some(JSValue::Number(n)) => n
            .as_u64()
            .map(|x| x as usize)
            .context(ParsingJsonNumberSnafu {}),
        Some(JSValue::String(s)) => s.parse::<usize>().ok().context(ParsingJsonNumberSnafu {}),
        _ => None.context(ParsingJsonNumberSnafu {}),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rules_default_to_the_library_rules() {
        let rules = SurveyRules::default();
        assert_eq!(rules.scoring_rules().unwrap(), ScoringRules::DEFAULT_RULES);
        assert_eq!(
            rules.propagation_rules().unwrap(),
            PropagationRules::DEFAULT_RULES
        );
    }

    #[test]
    fn reads_camel_case_config() {
        let js = r#"{
            "outputSettings": { "projectName": "Pilot" },
            "responseSources": [ { "provider": "json", "filePath": "r.json", "alignmentScore": 0.5 } ],
            "rules": { "positionDecay": 0.1, "maxNodes": "1000", "diffusionMode": "out" }
        }"#;
        let config: SurveyConfig = serde_json::from_str(js).unwrap();
        assert_eq!(config.output_settings.project_name, "Pilot");
        assert_eq!(config.response_sources[0].alignment_score, Some(0.5));
        assert!(config.store.is_none());
        assert_eq!(config.rules.scoring_rules().unwrap().position_decay, 0.1);
        let p = config.rules.propagation_rules().unwrap();
        assert_eq!(p.max_nodes, 1000);
        assert_eq!(p.diffusion_mode, NeighborMode::Out);
    }

    #[test]
    fn rejects_bad_rules() {
        let rules = SurveyRules {
            layer_discounts: Some(vec![0.1, 0.2]),
            ..SurveyRules::default()
        };
        assert!(rules.propagation_rules().is_err());
        let rules = SurveyRules {
            normalization_constant: Some(0.0),
            ..SurveyRules::default()
        };
        assert!(rules.scoring_rules().is_err());
    }
}
