use carebridge_core::Bundle;

use crate::search::SearchParams;

/// Attach navigation links to a search result bundle.
///
/// Links are rebuilt from the original query with only `_offset` rewritten:
/// `self` is always present; `first` and `previous` only when the page has
/// something before it (`offset > 0`); `next` and `last` only when results
/// remain past this page (`offset + count < total`).
pub fn add_navigation_links(
    bundle: &mut Bundle,
    base_url: &str,
    kind: &str,
    params: &SearchParams,
    total: usize,
) {
    let count = params.count();
    let offset = params.offset();
    let page =
        |offset: usize| format!("{base_url}/{kind}?{}", params.query_string_with_offset(offset));

    bundle.add_link("self", page(offset));
    if offset > 0 {
        bundle.add_link("first", page(0));
        bundle.add_link("previous", page(offset.saturating_sub(count)));
    }
    if count > 0 && offset + count < total {
        bundle.add_link("next", page(offset + count));
        let last_offset = ((total - 1) / count) * count;
        bundle.add_link("last", page(last_offset));
    }
}
