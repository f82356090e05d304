// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! CAD layer names
//!
//! AIA CAD layer guidelines build names from dash-separated fields, most
//! general first (`A-SPAC-PPLN-AREA`). The rightmost run of word characters
//! is the most specific descriptor and is used as a feature's default name.

/// Rightmost run of word characters (`[A-Za-z0-9_]`) of a layer name.
///
/// Returns `None` if the name does not end in a word character. Trailing
/// whitespace counts as a non-word character; only a single final newline
/// is ignored.
///
/// ```
/// use floornet_core::simplify_layer_name;
///
/// assert_eq!(simplify_layer_name("A-SPAC-PPLN-AREA"), Some("AREA"));
/// assert_eq!(simplify_layer_name("A-SPAC-"), None);
/// ```
pub fn simplify_layer_name(layer: &str) -> Option<&str> {
    let trimmed = layer.strip_suffix('\n').unwrap_or(layer);
    let start = trimmed
        .char_indices()
        .rev()
        .take_while(|&(_, c)| c.is_ascii_alphanumeric() || c == '_')
        .last()
        .map(|(idx, _)| idx)?;
    Some(&trimmed[start..])
}
