//! Target registry: the ordered roster of sites we know how to check in to.
//!
//! The built-in roster covers NexusPHP trackers (attendance page + index page)
//! and the fnOS forum (token-signed check-in). The config file can append more
//! targets and grammars.

use std::collections::{BTreeMap, HashSet};

use regex::Regex;
use tracing::debug;

use crate::config::Config;
use crate::credentials::CredentialSource;
use crate::grammar::{FieldSpec, Grammar, GrammarError};
use crate::model::{Checkin, TargetDescriptor};

/// Errors raised while assembling the registry.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("duplicate target id: {0}")]
    DuplicateTarget(String),

    #[error("target {target}: {source}")]
    Grammar {
        target: String,
        #[source]
        source: GrammarError,
    },

    #[error("target {target}: invalid token pattern: {source}")]
    TokenPattern {
        target: String,
        #[source]
        source: regex::Error,
    },
}

/// NexusPHP trackers: id, credential variable, base URL.
const NEXUSPHP_SITES: &[(&str, &str, &str)] = &[
    ("ICC2022", "icc2022_cookie", "https://www.icc2022.com"),
    ("HDTIME", "HDTIME_cookie", "https://hdtime.org"),
    ("HDVIDEO", "HDVIDEO_cookie", "https://hdvideo.one"),
    ("CARPTS", "CARPTS_cookie", "https://carpt.net"),
    ("ULTRAHD", "ULTRAHD_cookie", "https://ultrahd.net"),
    ("AFUN", "AFUN_cookie", "https://www.ptlover.cc"),
];

const FNOS_SIGN_URL: &str = "https://club.fnnas.com/plugin.php?id=zqlj_sign";

/// Names accepted by [`builtin_grammar`].
pub const BUILTIN_GRAMMARS: &[&str] = &[
    "nexusphp-attendance",
    "nexusphp-index",
    "fnos-sign",
    "any",
];

/// Compiles a built-in grammar by name.
pub fn builtin_grammar(name: &str) -> Result<Grammar, GrammarError> {
    match name {
        "nexusphp-attendance" => Grammar::compile(
            "欢迎回来",
            &[
                FieldSpec::new("times", "Check-ins", r"这是您的第.*?(\d+)"),
                FieldSpec::new("continue", "Streak (days)", r"已连续签到.*?(\d+)"),
                FieldSpec::new("reward", "Reward", r"本次签到获得.*?(\d+)"),
                FieldSpec::new("retroactive_cards", "Retroactive cards", r"目前拥有补签卡.*?(\d+)"),
                FieldSpec::new(
                    "today_rank",
                    "Today's rank",
                    r"今日签到排名：<b>(\d+)</b> / <b>(\d+)</b>",
                )
                .joined("/"),
            ],
        ),
        "nexusphp-index" => Grammar::compile(
            "欢迎回来",
            &[
                FieldSpec::new("share_ratio", "Share ratio", r"分享率.*?(\d+\.\d+)"),
                FieldSpec::new("upload_count", "Uploaded", r"上传量:</font>(.*?)<").stripped(),
                FieldSpec::new("download_count", "Downloaded", r"下载量:</font>(.*?)<").stripped(),
                FieldSpec::new("ml_count", "Bonus points", r"使用</a>]:(.*?)<").stripped(),
                FieldSpec::new("mails", "New messages", r"(\d+) 新"),
                FieldSpec::new("notices", "Announcements", r"(\d{4}\.\d{2}\.\d{2}) - <b>(.*?)</b>")
                    .joined(" - ")
                    .every_match(),
            ],
        ),
        "fnos-sign" => Grammar::compile(
            "今日已打卡",
            &[
                FieldSpec::new(
                    "recently_attendance",
                    "Last check-in",
                    r"最近打卡：(\d{4}-\d{2}-\d{2} \d{2}:\d{2}:\d{2})",
                ),
                FieldSpec::new("month_attendance_times", "This month", r"本月打卡：(\d+)"),
                FieldSpec::new("continue_attendance_times", "Streak (days)", r"连续打卡：(\d+)"),
                FieldSpec::new("total_attendance_times", "Total check-ins", r"累计打卡：(\d+)"),
                FieldSpec::new("total_reward", "Total reward", r"累计奖励：(\d+)"),
                FieldSpec::new("recently_reward", "Last reward", r"最近奖励：(\d+)"),
                FieldSpec::new("level", "Level", r"当前打卡等级：(.+?)</li>"),
            ],
        ),
        "any" => Ok(Grammar::accept_any()),
        other => Err(GrammarError::Unknown(other.to_string())),
    }
}

/// Ordered, id-unique list of targets.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    targets: Vec<TargetDescriptor>,
}

impl Registry {
    /// Builds a registry, rejecting duplicate ids.
    pub fn new(targets: Vec<TargetDescriptor>) -> Result<Self, RegistryError> {
        let mut seen = HashSet::new();
        for target in &targets {
            if !seen.insert(target.id.as_str()) {
                return Err(RegistryError::DuplicateTarget(target.id.clone()));
            }
        }
        Ok(Self { targets })
    }

    /// The built-in roster.
    pub fn builtin() -> Result<Self, RegistryError> {
        Self::new(builtin_targets()?)
    }

    /// The built-in roster followed by the targets declared in `config`.
    pub fn from_config(config: &Config) -> Result<Self, RegistryError> {
        let mut targets = builtin_targets()?;

        let mut declared = BTreeMap::new();
        for (name, grammar) in &config.grammars {
            let compiled =
                Grammar::compile(&grammar.sentinel, &grammar.fields).map_err(|source| {
                    RegistryError::Grammar {
                        target: format!("grammar {name}"),
                        source,
                    }
                })?;
            declared.insert(name.as_str(), compiled);
        }

        let resolve = |target: &str, name: &str| -> Result<Grammar, RegistryError> {
            match declared.get(name) {
                Some(g) => Ok(g.clone()),
                None => builtin_grammar(name).map_err(|source| RegistryError::Grammar {
                    target: target.to_string(),
                    source,
                }),
            }
        };

        for t in &config.targets {
            let checkin_grammar = resolve(&t.id, &t.grammar)?;
            let reference_grammar =
                resolve(&t.id, t.reference_grammar.as_deref().unwrap_or(&t.grammar))?;

            let checkin = match &t.token_pattern {
                Some(pattern) => Checkin::Signed {
                    page_url: t.checkin_url.clone(),
                    token: Regex::new(pattern).map_err(|source| RegistryError::TokenPattern {
                        target: t.id.clone(),
                        source,
                    })?,
                    param: t.token_param.clone().unwrap_or_else(|| "sign".to_string()),
                },
                None => Checkin::Direct {
                    url: t.checkin_url.clone(),
                },
            };

            debug!(target = %t.id, "registered target from config");
            targets.push(TargetDescriptor {
                id: t.id.clone(),
                credential_key: t.credential_key.clone(),
                checkin,
                reference_url: t.reference_url.clone(),
                checkin_grammar,
                reference_grammar,
            });
        }

        Self::new(targets)
    }

    pub fn iter(&self) -> impl Iterator<Item = &TargetDescriptor> {
        self.targets.iter()
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&TargetDescriptor> {
        self.targets.iter().find(|t| t.id == id)
    }

    /// Ids of targets whose credential is present, in registry order.
    pub fn active_ids(&self, credentials: &dyn CredentialSource) -> Vec<String> {
        self.targets
            .iter()
            .filter(|t| credentials.credential(&t.credential_key).is_some())
            .map(|t| t.id.clone())
            .collect()
    }
}

fn builtin_targets() -> Result<Vec<TargetDescriptor>, RegistryError> {
    let grammar = |target: &str, name: &str| {
        builtin_grammar(name).map_err(|source| RegistryError::Grammar {
            target: target.to_string(),
            source,
        })
    };

    let mut targets = Vec::with_capacity(NEXUSPHP_SITES.len() + 1);
    for &(id, key, base) in NEXUSPHP_SITES {
        targets.push(TargetDescriptor {
            id: id.to_string(),
            credential_key: key.to_string(),
            checkin: Checkin::Direct {
                url: format!("{base}/attendance.php"),
            },
            reference_url: format!("{base}/index.php"),
            checkin_grammar: grammar(id, "nexusphp-attendance")?,
            reference_grammar: grammar(id, "nexusphp-index")?,
        });
    }

    // The sign link only triggers the check-in; the page itself confirms it.
    targets.push(TargetDescriptor {
        id: "FNOS".to_string(),
        credential_key: "PV_COOKIE".to_string(),
        checkin: Checkin::Signed {
            page_url: FNOS_SIGN_URL.to_string(),
            token: Regex::new(r"sign=([A-Za-z0-9]+)").map_err(|source| {
                RegistryError::TokenPattern {
                    target: "FNOS".to_string(),
                    source,
                }
            })?,
            param: "sign".to_string(),
        },
        reference_url: FNOS_SIGN_URL.to_string(),
        checkin_grammar: Grammar::accept_any(),
        reference_grammar: grammar("FNOS", "fnos-sign")?,
    });

    Ok(targets)
}
