//! Active extension set resolution

use super::conditions::all_pass;
use crate::error::EngineResult;
use crate::model::{Context, Extension};
use crate::store::SourceProvider;

/// Active, condition-satisfying extensions for `target`, in application order.
///
/// The order depends only on `(priority, sequence, id)`, never on the order
/// in which the provider returns rows.
pub fn resolve_active(
    provider: &dyn SourceProvider,
    target: &str,
    context: &Context,
) -> EngineResult<Vec<Extension>> {
    let fetched = provider.active_extensions(target)?;
    let fetched_count = fetched.len();

    let mut active: Vec<Extension> = fetched
        .into_iter()
        .filter(|ext| ext.active && ext.target_name == target)
        .filter(|ext| all_pass(&ext.conditions, context))
        .collect();
    order_extensions(&mut active);

    log::debug!(
        "resolved {} of {} extension(s) for '{}'",
        active.len(),
        fetched_count,
        target
    );
    Ok(active)
}

/// Sort by `(priority asc, sequence asc, id asc)`
pub fn order_extensions(extensions: &mut [Extension]) {
    extensions.sort_by_key(Extension::ordering_key);
}
