use domain::protocol::{comment_root_param, OBJECT_RULES};
use domain::{Mention, ObjectHint, PipelineError, ResolvedTarget, TargetType};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::traits::AliasLookup;

/// Turns a loosely structured mention into reply addressing.
pub struct IdentifierResolver {
    lookup: Arc<dyn AliasLookup>,
}

impl IdentifierResolver {
    pub fn new(lookup: Arc<dyn AliasLookup>) -> Self {
        Self { lookup }
    }

    pub async fn resolve(&self, mention: &Mention) -> Result<ResolvedTarget, PipelineError> {
        let object_id = self
            .resolve_object_id(mention)
            .await
            .ok_or(PipelineError::UnresolvableTarget {
                mention_id: mention.id,
            })?;

        Ok(ResolvedTarget {
            object_id,
            root_id: resolve_root_id(mention),
            parent_id: mention.explicit_parent_id.max(0),
            target_type: TargetType::from_declared(mention.declared_type),
        })
    }

    async fn resolve_object_id(&self, mention: &Mention) -> Option<i64> {
        for (rule, apply) in OBJECT_RULES {
            match apply(mention) {
                Some(ObjectHint::Id(id)) => {
                    debug!(mention_id = mention.id, rule, object_id = id, "Object id resolved");
                    return Some(id);
                }
                Some(ObjectHint::Alias(alias)) => match self.lookup.resolve_alias(&alias).await {
                    Ok(id) if id > 0 => {
                        debug!(mention_id = mention.id, rule, %alias, object_id = id, "Object id resolved via alias");
                        return Some(id);
                    }
                    Ok(id) => {
                        warn!(mention_id = mention.id, %alias, id, "Alias lookup returned unusable id");
                    }
                    Err(e) => {
                        warn!(mention_id = mention.id, %alias, error = %e, "Alias lookup failed, trying next rule");
                    }
                },
                None => {}
            }
        }
        None
    }
}

pub fn resolve_root_id(mention: &Mention) -> i64 {
    if mention.explicit_root_id > 0 {
        return mention.explicit_root_id;
    }
    comment_root_param(&mention.raw_link).unwrap_or(0)
}
