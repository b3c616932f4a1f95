//! Variant expansion: one catalog entry into its ordered stream of units.
//!
//! Position mode yields one unit per configured camera slot. Attribute mode
//! yields the full color x style x size cross-product in declared order,
//! outermost color, innermost size, resolving each combination's source shot
//! through the config's lookup table.

use crate::catalog::CatalogEntry;
use crate::config::{Config, ExpansionMode};

/// A synthesized source image: the pieces of the filename the host serves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Shot {
    pub style_token: String,
    pub color_label: String,
    pub camera: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnitKind {
    Position {
        camera: String,
    },
    Attributes {
        color_token: String,
        color_label: String,
        style_token: String,
        style_label: String,
        size: String,
        /// Shot backing the Image Src column; None when the combination is
        /// absent from the lookup table (renders as an empty reference).
        image_shot: Option<Shot>,
        /// Full-length shot of this unit's own style and color, backing the
        /// Variant Image column.
        variant_shot: Shot,
    },
}

/// One expansion unit with its 1-based position in the entry's stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unit {
    pub index: usize,
    pub kind: UnitKind,
}

/// Expand one catalog entry into its unit stream, lazily.
pub fn expand<'a>(
    entry: &'a CatalogEntry,
    config: &'a Config,
) -> Box<dyn Iterator<Item = Unit> + 'a> {
    match config.mode {
        ExpansionMode::Positions => Box::new(expand_positions(config)),
        ExpansionMode::Attributes => Box::new(expand_attributes(entry, config)),
    }
}

fn expand_positions(config: &Config) -> impl Iterator<Item = Unit> + '_ {
    config.positions.iter().enumerate().map(|(i, pos)| Unit {
        index: i + 1,
        kind: UnitKind::Position {
            camera: pos.camera.clone(),
        },
    })
}

fn expand_attributes<'a>(
    _entry: &'a CatalogEntry,
    config: &'a Config,
) -> impl Iterator<Item = Unit> + 'a {
    config
        .colors
        .iter()
        .flat_map(move |color| {
            config.styles.iter().flat_map(move |style| {
                config.sizes.iter().map(move |size| {
                    let image_shot = config
                        .variant_image_for(&color.token, &style.token, size)
                        .map(|v| Shot {
                            style_token: v.image_style.clone(),
                            color_label: v.image_color.clone(),
                            camera: v.camera.clone(),
                        });
                    // The variant image is always the full shot of the
                    // unit's own style in the unit's own color.
                    let variant_shot = Shot {
                        style_token: style.token.clone(),
                        color_label: color.label.clone(),
                        camera: "CamFull".to_string(),
                    };
                    UnitKind::Attributes {
                        color_token: color.token.clone(),
                        color_label: color.label.clone(),
                        style_token: style.token.clone(),
                        style_label: style.label.clone(),
                        size: size.clone(),
                        image_shot,
                        variant_shot,
                    }
                })
            })
        })
        .enumerate()
        .map(|(i, kind)| Unit { index: i + 1, kind })
}
