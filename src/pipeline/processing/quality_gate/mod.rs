use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::config::CleaningConfig;
use crate::constants::{SATISFACTION_MAX, SATISFACTION_MIN};
use crate::types::SurveyRecord;

/// Machine-readable failure codes. Declaration order is the canonical order
/// in which codes appear inside a quarantine reason.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ReasonCode {
    /// `fecha` is null after parsing
    FechaInvalida,
    /// `satisfaccion` is an integer outside 1..=10
    SatisfFueraRango,
    /// `satisfaccion` text is neither NS/NC nor numeric (strict policy only)
    SatisfNoNumerica,
    /// `id_respuesta` is null, blank, or the column is absent
    IdRespuestaVacio,
}

impl ReasonCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReasonCode::FechaInvalida => "fecha_invalida",
            ReasonCode::SatisfFueraRango => "satisf_fuera_rango",
            ReasonCode::SatisfNoNumerica => "satisf_no_numerica",
            ReasonCode::IdRespuestaVacio => "id_respuesta_vacio",
        }
    }

    pub fn all() -> impl Iterator<Item = ReasonCode> {
        [
            ReasonCode::FechaInvalida,
            ReasonCode::SatisfFueraRango,
            ReasonCode::SatisfNoNumerica,
            ReasonCode::IdRespuestaVacio,
        ]
        .into_iter()
    }
}

impl fmt::Display for ReasonCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReasonCode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ReasonCode::all()
            .find(|code| code.as_str() == s)
            .ok_or_else(|| format!("unknown quarantine reason code '{}'", s))
    }
}

/// Ordered, duplicate-free list of failure codes for one record. Rendered as
/// the semicolon-joined `_quarantine_reason` string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct QuarantineReason(Vec<ReasonCode>);

impl QuarantineReason {
    /// Append `code` unless it is already present.
    pub fn push(&mut self, code: ReasonCode) {
        if !self.0.contains(&code) {
            self.0.push(code);
        }
    }

    pub fn codes(&self) -> &[ReasonCode] {
        &self.0
    }

    pub fn contains(&self, code: ReasonCode) -> bool {
        self.0.contains(&code)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<ReasonCode> for QuarantineReason {
    fn from(code: ReasonCode) -> Self {
        Self(vec![code])
    }
}

impl fmt::Display for QuarantineReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, code) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(";")?;
            }
            f.write_str(code.as_str())?;
        }
        Ok(())
    }
}

impl FromStr for QuarantineReason {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut reason = QuarantineReason::default();
        for part in s.split(';').filter(|p| !p.is_empty()) {
            reason.push(part.parse()?);
        }
        Ok(reason)
    }
}

impl Serialize for QuarantineReason {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for QuarantineReason {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}

/// A named quality predicate. `fails` returns true when the record violates
/// the rule.
#[derive(Clone, Copy)]
pub struct QualityRule {
    pub code: ReasonCode,
    pub description: &'static str,
    pub fails: fn(&SurveyRecord) -> bool,
}

impl fmt::Debug for QualityRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QualityRule")
            .field("code", &self.code)
            .field("description", &self.description)
            .finish()
    }
}

fn fecha_invalida(record: &SurveyRecord) -> bool {
    record.fecha.is_none()
}

fn satisf_fuera_rango(record: &SurveyRecord) -> bool {
    record
        .satisfaccion_num
        .is_some_and(|n| !(SATISFACTION_MIN..=SATISFACTION_MAX).contains(&n))
}

fn satisf_no_numerica(record: &SurveyRecord) -> bool {
    record.satisfaccion.is_some() && record.satisfaccion_num.is_none()
}

fn id_respuesta_vacio(record: &SurveyRecord) -> bool {
    record.business_key().is_none()
}

pub const FECHA_INVALIDA: QualityRule = QualityRule {
    code: ReasonCode::FechaInvalida,
    description: "fecha is missing or could not be parsed as a date",
    fails: fecha_invalida,
};

pub const SATISF_FUERA_RANGO: QualityRule = QualityRule {
    code: ReasonCode::SatisfFueraRango,
    description: "satisfaccion is an integer outside 1-10",
    fails: satisf_fuera_rango,
};

pub const SATISF_NO_NUMERICA: QualityRule = QualityRule {
    code: ReasonCode::SatisfNoNumerica,
    description: "satisfaccion is neither a number nor a no-answer phrasing",
    fails: satisf_no_numerica,
};

pub const ID_RESPUESTA_VACIO: QualityRule = QualityRule {
    code: ReasonCode::IdRespuestaVacio,
    description: "id_respuesta is missing or blank",
    fails: id_respuesta_vacio,
};

/// Ordered table of quality rules evaluated uniformly against every record.
#[derive(Debug, Clone)]
pub struct RuleSet {
    rules: Vec<QualityRule>,
}

impl RuleSet {
    /// The three standing rules.
    pub fn standard() -> Self {
        Self {
            rules: vec![FECHA_INVALIDA, SATISF_FUERA_RANGO, ID_RESPUESTA_VACIO],
        }
    }

    /// Standard rules plus `satisf_no_numerica`.
    pub fn strict() -> Self {
        Self::standard().with_rule(SATISF_NO_NUMERICA)
    }

    pub fn from_config(config: &CleaningConfig) -> Self {
        if config.strict_satisfaction {
            Self::strict()
        } else {
            Self::standard()
        }
    }

    /// Add a rule, keeping the table in canonical code order. A rule whose
    /// code is already present replaces nothing and is ignored.
    pub fn with_rule(mut self, rule: QualityRule) -> Self {
        if !self.rules.iter().any(|r| r.code == rule.code) {
            self.rules.push(rule);
            self.rules.sort_by_key(|r| r.code);
        }
        self
    }

    pub fn rules(&self) -> &[QualityRule] {
        &self.rules
    }

    /// Codes of every failed rule, in canonical order. Empty means the record
    /// is clean.
    pub fn evaluate(&self, record: &SurveyRecord) -> QuarantineReason {
        let mut reason = QuarantineReason::default();
        for rule in self.rules.iter().filter(|rule| (rule.fails)(record)) {
            reason.push(rule.code);
        }
        reason
    }
}

impl Default for RuleSet {
    fn default() -> Self {
        Self::standard()
    }
}
