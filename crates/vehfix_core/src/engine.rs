use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::error::{CoreError, CoreErrorCode};
use crate::text::read_text_file;
use crate::tokenizer::{split_lines, tokenize_line};

/// Torque (Nm) times rpm divided by this gives power in hp.
const POWER_DIVISOR: f64 = 7120.8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RpmTorqueSample {
    pub rpm: i32,
    pub back_torque: i32,
    pub torque: i32,
    pub power: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CurvePeak {
    pub rpm: i32,
    pub value: i32,
}

/// A `(value, range)` tuple such as `LifetimeEngineRPM=(17500, 500)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RangedValue {
    pub value: String,
    pub range: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EngineSummary {
    pub path: PathBuf,
    pub lifetime_rpm: Option<RangedValue>,
    pub lifetime_oil_temp: Option<RangedValue>,
    pub lifetime_avg: Option<String>,
    pub lifetime_var: Option<String>,
    pub optimum_oil_temp: Option<String>,
    pub samples: Vec<RpmTorqueSample>,
    pub max_torque: Option<CurvePeak>,
    pub max_power: Option<CurvePeak>,
}

impl EngineSummary {
    pub fn parse_file(path: &Path) -> Result<Self, CoreError> {
        let text = read_text_file(path)?;
        Self::parse_text(path, &text)
    }

    pub fn parse_text(path: impl Into<PathBuf>, text: &str) -> Result<Self, CoreError> {
        let mut engine = Self {
            path: path.into(),
            ..Self::default()
        };

        for (line_no, (line, _)) in split_lines(text).enumerate() {
            let Some(kv) = tokenize_line(line).key_value else {
                continue;
            };
            let value = kv.unquoted().trim();
            match kv.key.to_ascii_lowercase().as_str() {
                "lifetimeenginerpm" => engine.lifetime_rpm = parse_ranged(value),
                "lifetimeoiltemp" => engine.lifetime_oil_temp = parse_ranged(value),
                "lifetimeavg" => engine.lifetime_avg = Some(value.to_string()),
                "lifetimevar" => engine.lifetime_var = Some(value.to_string()),
                "optimumoiltemp" => engine.optimum_oil_temp = Some(value.to_string()),
                "rpmtorque" => {
                    let sample = parse_sample(value).ok_or_else(|| {
                        CoreError::new(
                            CoreErrorCode::Parse,
                            format!(
                                "{}:{}: malformed RPMTorque '{value}'",
                                engine.path.display(),
                                line_no + 1
                            ),
                        )
                    })?;
                    engine.samples.push(sample);
                }
                _ => {}
            }
        }

        engine.max_torque = peak(&engine.samples, |sample| sample.torque);
        engine.max_power = peak(&engine.samples, |sample| sample.power);
        Ok(engine)
    }
}

fn tuple_items(value: &str) -> Vec<&str> {
    let inner = value.trim().trim_start_matches('(');
    let inner = inner.split(')').next().unwrap_or(inner);
    inner.split(',').map(str::trim).collect()
}

fn parse_ranged(value: &str) -> Option<RangedValue> {
    match tuple_items(value).as_slice() {
        [value, range, ..] => Some(RangedValue {
            value: value.to_string(),
            range: range.to_string(),
        }),
        _ => None,
    }
}

fn parse_sample(value: &str) -> Option<RpmTorqueSample> {
    let items = tuple_items(value);
    let [rpm, back_torque, torque] = items.as_slice() else {
        return None;
    };
    let rpm = whole(rpm)?;
    let torque = whole(torque)?;
    Some(RpmTorqueSample {
        rpm,
        back_torque: whole(back_torque)?,
        torque,
        power: (f64::from(torque) * f64::from(rpm) / POWER_DIVISOR) as i32,
    })
}

// Curves are written with decimals; summaries use whole numbers.
fn whole(item: &str) -> Option<i32> {
    item.parse::<f64>().ok().map(|v| v as i32)
}

/// The first sample holding the maximum of `metric`.
fn peak(
    samples: &[RpmTorqueSample],
    metric: impl Fn(&RpmTorqueSample) -> i32,
) -> Option<CurvePeak> {
    samples.iter().fold(None, |best: Option<CurvePeak>, sample| {
        let value = metric(sample);
        match best {
            Some(best) if best.value >= value => Some(best),
            _ => Some(CurvePeak {
                rpm: sample.rpm,
                value,
            }),
        }
    })
}
