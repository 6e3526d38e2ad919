//! Outbound path rewriting.

use crate::config::schema::{
    PathRewriteConfig, ProxyConfig, RewriteCondition, BILLING_SERVICE, PRIMARY_SERVICE,
};

/// Replaces the first occurrence of `from` with `to`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathRewrite {
    from: String,
    to: String,
}

impl PathRewrite {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
        }
    }

    /// Compile a configured rewrite, or `None` when its condition does not
    /// hold for this configuration.
    pub fn from_config(rewrite: &PathRewriteConfig, config: &ProxyConfig) -> Option<Self> {
        condition_holds(rewrite.when, config).then(|| Self::new(&rewrite.from, &rewrite.to))
    }

    pub fn apply(&self, path: &str) -> String {
        path.replacen(&self.from, &self.to, 1)
    }

    pub fn from(&self) -> &str {
        &self.from
    }

    pub fn to(&self) -> &str {
        &self.to
    }
}

fn condition_holds(condition: RewriteCondition, config: &ProxyConfig) -> bool {
    match condition {
        RewriteCondition::Always => true,
        RewriteCondition::PrimaryOnBillingPort => {
            match (config.service(PRIMARY_SERVICE), config.service(BILLING_SERVICE)) {
                (Some(primary), Some(billing)) => primary.port == billing.port,
                _ => false,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::loader::set_primary_port;

    fn profile_rewrite() -> PathRewriteConfig {
        PathRewriteConfig {
            from: "/api/xamops/user/profile".into(),
            to: "/api/billops/profile".into(),
            when: RewriteCondition::PrimaryOnBillingPort,
        }
    }

    #[test]
    fn replaces_first_occurrence_only() {
        let rewrite = PathRewrite::new("/a", "/b");
        assert_eq!(rewrite.apply("/a/x/a"), "/b/x/a");
        assert_eq!(rewrite.apply("/c"), "/c");
    }

    #[test]
    fn conditional_rewrite_follows_primary_port() {
        let mut config = ProxyConfig::default();
        assert_eq!(PathRewrite::from_config(&profile_rewrite(), &config), None);

        set_primary_port(&mut config, 8082);
        let rewrite = PathRewrite::from_config(&profile_rewrite(), &config).unwrap();
        assert_eq!(
            rewrite.apply("/api/xamops/user/profile"),
            "/api/billops/profile"
        );
    }

    #[test]
    fn unconditional_rewrite_always_compiles() {
        let config = ProxyConfig::default();
        let cfg = PathRewriteConfig {
            when: RewriteCondition::Always,
            ..profile_rewrite()
        };
        assert!(PathRewrite::from_config(&cfg, &config).is_some());
    }
}
