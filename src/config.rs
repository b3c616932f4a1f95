//! Run configuration.
//!
//! Everything the original per-product-line scripts hardcoded lives here:
//! the image host, the variant dimension tables, the combination-to-image
//! lookup, prices, and the fixed Shopify fields. A config file is optional;
//! the compiled-in presets reproduce the known product lines and
//! `init-config` writes one out for editing.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Which expansion shape a run uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExpansionMode {
    /// One unit per camera position (single-variant products, several photos).
    Positions,
    /// Full color x style x size cross-product.
    Attributes,
}

/// Which parsed fields form the catalog deduplication key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentityKey {
    Handle,
    HandleType,
    HandleTypeColor,
}

/// One camera position slot (position-mode dimension table).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Position {
    pub index: u32,
    pub camera: String,
}

/// A machine token and its display label. Kept as ordered pairs so the
/// declaration order drives expansion traversal order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabeledToken {
    pub token: String,
    pub label: String,
}

/// Maps one observed (color, style, size) combination to the source shot
/// backing its `Image Src` column. Combinations absent from the table get an
/// empty image reference.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VariantImage {
    pub color: String,
    pub style: String,
    pub size: String,
    /// Style token used in the synthesized filename.
    pub image_style: String,
    /// Color label used in the synthesized filename.
    pub image_color: String,
    pub camera: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceEntry {
    /// Style display label.
    pub style: String,
    pub price: String,
}

/// Month range for synthetic collection dates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DateRange {
    pub start_year: i32,
    pub start_month: u32,
    pub end_year: i32,
    pub end_month: u32,
}

/// Fixed Shopify fields stamped onto every parent row.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FixedFields {
    pub vendor: String,
    pub product_category: String,
    pub published: String,
    pub inventory_tracker: String,
    pub inventory_qty: String,
    pub inventory_policy: String,
    pub fulfillment_service: String,
    pub weight_unit: String,
    pub status: String,
    pub default_price: String,
    /// Body (HTML) used when no description file is configured.
    pub default_body: String,
    pub color_option_link: String,
    pub size_option_link: String,
}

impl Default for FixedFields {
    fn default() -> Self {
        Self {
            vendor: "My Store".to_string(),
            product_category: "Software > Digital Goods & Currency > Digital Artwork"
                .to_string(),
            published: "TRUE".to_string(),
            inventory_tracker: "shopify".to_string(),
            inventory_qty: "0".to_string(),
            inventory_policy: "continue".to_string(),
            fulfillment_service: "manual".to_string(),
            weight_unit: "lb".to_string(),
            status: "active".to_string(),
            default_price: "485".to_string(),
            default_body: String::new(),
            color_option_link: "product.metafields.shopify.color-pattern".to_string(),
            size_option_link: "product.metafields.shopify.size".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub mode: ExpansionMode,
    pub identity: IdentityKey,
    /// Whether the filename convention carries a color token.
    pub parse_color: bool,
    /// Secondary naming convention: the leading token is a hyphenated
    /// handle (`foo-bar`), and the title is derived from it (`Foo Bar`)
    /// instead of reusing the token verbatim.
    pub hyphenated_handles: bool,
    /// Base URL the product images are uploaded under. Trailing slash matters.
    pub image_host_url: String,
    pub positions: Vec<Position>,
    pub colors: Vec<LabeledToken>,
    pub styles: Vec<LabeledToken>,
    pub sizes: Vec<String>,
    pub variant_images: Vec<VariantImage>,
    pub price_per_style: Vec<PriceEntry>,
    pub fixed: FixedFields,
    /// When set, each catalog entry gets a random collection date in range
    /// and the catalog sorts by date before filename.
    pub collection_dates: Option<DateRange>,
    /// Plain-text file inlined verbatim into parent rows' Body (HTML).
    pub description_file: Option<PathBuf>,
    /// Fail the run if the description file is missing or unreadable.
    pub description_required: bool,
    /// Fill Variant SKU from truncated identity tokens (attribute mode).
    pub generate_skus: bool,
    pub check_links: bool,
    pub http_timeout_secs: u64,
    pub max_probe_workers: usize,
}

impl Default for Config {
    /// The gallery-art product line: four camera positions, dated
    /// collections, no color token in filenames.
    fn default() -> Self {
        Self {
            mode: ExpansionMode::Positions,
            identity: IdentityKey::HandleType,
            parse_color: false,
            hyphenated_handles: false,
            image_host_url: "https://gsimagehost.com/macrocentric/".to_string(),
            positions: vec![
                Position { index: 1, camera: "CamGallery".to_string() },
                Position { index: 2, camera: "CamClose".to_string() },
                Position { index: 3, camera: "Cam1".to_string() },
                Position { index: 4, camera: "Cam2".to_string() },
            ],
            colors: Vec::new(),
            styles: Vec::new(),
            sizes: Vec::new(),
            variant_images: Vec::new(),
            price_per_style: Vec::new(),
            fixed: FixedFields::default(),
            collection_dates: Some(DateRange {
                start_year: 2023,
                start_month: 8,
                end_year: 2024,
                end_month: 11,
            }),
            description_file: None,
            description_required: false,
            generate_skus: false,
            check_links: true,
            http_timeout_secs: 15,
            max_probe_workers: 32,
        }
    }
}

impl Config {
    /// The apparel product line: 2 colors x 3 styles x 6 sizes, explicit
    /// combination-to-image table, per-style prices.
    pub fn apparel() -> Self {
        let styles = vec![
            LabeledToken { token: "tshirt".to_string(), label: "T-shirt".to_string() },
            LabeledToken { token: "longsleeve".to_string(), label: "Sweatshirt".to_string() },
            LabeledToken {
                token: "longsleeveTshirt".to_string(),
                label: "Long Sleeve T-shirt".to_string(),
            },
        ];
        let price_per_style = styles
            .iter()
            .map(|s| PriceEntry { style: s.label.clone(), price: "20".to_string() })
            .collect();

        Self {
            mode: ExpansionMode::Attributes,
            identity: IdentityKey::Handle,
            parse_color: true,
            hyphenated_handles: false,
            image_host_url: "https://gsimagehost.com/skullz/".to_string(),
            positions: vec![
                Position { index: 1, camera: "CamClose".to_string() },
                Position { index: 2, camera: "CamFull".to_string() },
            ],
            colors: vec![
                LabeledToken { token: "black".to_string(), label: "Black".to_string() },
                LabeledToken { token: "silver".to_string(), label: "White".to_string() },
            ],
            styles,
            sizes: ["xs", "s", "m", "l", "xl", "2xl"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            variant_images: apparel_variant_images(),
            price_per_style,
            fixed: FixedFields {
                product_category: "Apparel & Accessories > Clothing > Clothing Tops > T-Shirts"
                    .to_string(),
                inventory_qty: "50".to_string(),
                inventory_policy: "deny".to_string(),
                default_price: "20".to_string(),
                default_body: "<ul><li>Great design on a high-quality, soft Bella-Canvas \
                               shirt offers comfort and durability.</li><li>Shirt style and \
                               design colors may not match the preview exactly due to monitor \
                               differences and manufacturing variations.</li></ul>"
                    .to_string(),
                ..FixedFields::default()
            },
            collection_dates: None,
            description_file: None,
            description_required: false,
            generate_skus: true,
            check_links: true,
            http_timeout_secs: 15,
            max_probe_workers: 32,
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("failed to parse config file: {}", path.display()))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)
            .with_context(|| format!("failed to write config file: {}", path.display()))
    }

    /// Price for a style label, falling back to the fixed default.
    pub fn price_for(&self, style_label: &str) -> &str {
        self.price_per_style
            .iter()
            .find(|p| p.style == style_label)
            .map(|p| p.price.as_str())
            .unwrap_or(&self.fixed.default_price)
    }

    /// Source shot for one (color, style, size) combination, if observed.
    pub fn variant_image_for(
        &self,
        color: &str,
        style: &str,
        size: &str,
    ) -> Option<&VariantImage> {
        self.variant_images
            .iter()
            .find(|v| v.color == color && v.style == style && v.size == size)
    }

    /// Metafield list value, e.g. "black; silver".
    pub fn color_metafield(&self) -> String {
        let tokens: Vec<&str> = self.colors.iter().map(|c| c.token.as_str()).collect();
        tokens.join("; ")
    }

    /// Metafield list value, e.g. "xs; s; m; l; xl; 2xl".
    pub fn size_metafield(&self) -> String {
        let sizes: Vec<&str> = self.sizes.iter().map(|s| s.as_str()).collect();
        sizes.join("; ")
    }
}

/// The observed combination-to-image table for the apparel line. Only these
/// combinations have dedicated shots; everything else gets an empty Image Src.
fn apparel_variant_images() -> Vec<VariantImage> {
    let table: &[(&str, &str, &str, &str, &str, &str)] = &[
        ("black", "tshirt", "xs", "tshirt", "Black", "CamClose"),
        ("black", "tshirt", "s", "tshirt", "Black", "CamFull"),
        ("black", "tshirt", "m", "tshirt", "White", "CamFull"),
        ("black", "tshirt", "l", "longsleeve", "Black", "CamFull"),
        ("black", "tshirt", "xl", "longsleeve", "White", "CamFull"),
        ("black", "tshirt", "2xl", "longsleeveTshirt", "Black", "CamFull"),
        ("black", "longsleeve", "xs", "longsleeveTshirt", "White", "CamFull"),
    ];
    table
        .iter()
        .map(|(color, style, size, image_style, image_color, camera)| VariantImage {
            color: color.to_string(),
            style: style.to_string(),
            size: size.to_string(),
            image_style: image_style.to_string(),
            image_color: image_color.to_string(),
            camera: camera.to_string(),
        })
        .collect()
}
