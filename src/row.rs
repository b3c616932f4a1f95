//! Row synthesis: expansion units into parent/child import rows.
//!
//! The bulk-import format wants one "parent" row per product carrying the
//! full field set, then sparse "child" rows for the remaining variants of the
//! same handle. The synthesizer is an explicit fold over the unit stream
//! carrying the last identity key written: a unit whose key differs from the
//! previous one starts a new parent. Catalog ordering keeps same-key units
//! contiguous; a non-contiguous stream would re-emit a parent for the
//! revisited key (see DESIGN.md).

use std::time::{SystemTime, UNIX_EPOCH};

use crate::catalog::CatalogEntry;
use crate::config::{Config, ExpansionMode};
use crate::expand::{Shot, Unit, UnitKind};

/// Full column list for position-mode output files.
pub const POSITION_COLUMNS: &[&str] = &[
    "Handle",
    "Title",
    "Body (HTML)",
    "Vendor",
    "Product Category",
    "Type",
    "Tags",
    "Published",
    "Collection",
    "Option1 Name",
    "Option1 Value",
    "Option1 Linked To",
    "Option2 Name",
    "Option2 Value",
    "Option2 Linked To",
    "Option3 Name",
    "Option3 Value",
    "Option3 Linked To",
    "Variant SKU",
    "Variant Grams",
    "Variant Inventory Tracker",
    "Variant Inventory Qty",
    "Variant Inventory Policy",
    "Variant Fulfillment Service",
    "Variant Price",
    "Variant Compare At Price",
    "Variant Requires Shipping",
    "Variant Taxable",
    "Variant Barcode",
    "Image Src",
    "Image Position",
    "Image Alt Text",
    "Gift Card",
    "SEO Title",
    "SEO Description",
    "Google Shopping / Google Product Category",
    "Google Shopping / Gender",
    "Google Shopping / Age Group",
    "Google Shopping / MPN",
    "Google Shopping / Condition",
    "Google Shopping / Custom Product",
    "Google Shopping / Custom Label 0",
    "Google Shopping / Custom Label 1",
    "Google Shopping / Custom Label 2",
    "Google Shopping / Custom Label 3",
    "Google Shopping / Custom Label 4",
    "Variant Image",
    "Variant Weight Unit",
    "Variant Tax Code",
    "Cost per item",
    "Included / United States",
    "Price / United States",
    "Compare At Price / United States",
    "Included / International",
    "Price / International",
    "Compare At Price / International",
    "Status",
];

/// Full column list for attribute-mode output files. No Collection column;
/// carries the clothing metafield columns instead.
pub const ATTRIBUTE_COLUMNS: &[&str] = &[
    "Handle",
    "Title",
    "Body (HTML)",
    "Vendor",
    "Product Category",
    "Type",
    "Tags",
    "Published",
    "Option1 Name",
    "Option1 Value",
    "Option1 Linked To",
    "Option2 Name",
    "Option2 Value",
    "Option2 Linked To",
    "Option3 Name",
    "Option3 Value",
    "Option3 Linked To",
    "Variant SKU",
    "Variant Grams",
    "Variant Inventory Tracker",
    "Variant Inventory Qty",
    "Variant Inventory Policy",
    "Variant Fulfillment Service",
    "Variant Price",
    "Variant Compare At Price",
    "Variant Requires Shipping",
    "Variant Taxable",
    "Variant Barcode",
    "Image Src",
    "Image Position",
    "Image Alt Text",
    "Gift Card",
    "SEO Title",
    "SEO Description",
    "Google Shopping / Google Product Category",
    "Google Shopping / Gender",
    "Google Shopping / Age Group",
    "Google Shopping / MPN",
    "Google Shopping / Condition",
    "Google Shopping / Custom Product",
    "Google Shopping / Custom Label 0",
    "Google Shopping / Custom Label 1",
    "Google Shopping / Custom Label 2",
    "Google Shopping / Custom Label 3",
    "Google Shopping / Custom Label 4",
    "Clothing features (product.metafields.shopify.clothing-features)",
    "Color (product.metafields.shopify.color-pattern)",
    "Size (product.metafields.shopify.size)",
    "Variant Image",
    "Variant Weight Unit",
    "Variant Tax Code",
    "Cost per item",
    "Included / United States",
    "Price / United States",
    "Compare At Price / United States",
    "Included / International",
    "Price / International",
    "Compare At Price / International",
    "Status",
];

pub fn columns(mode: ExpansionMode) -> &'static [&'static str] {
    match mode {
        ExpansionMode::Positions => POSITION_COLUMNS,
        ExpansionMode::Attributes => ATTRIBUTE_COLUMNS,
    }
}

/// Full-field row, emitted once per contiguous run of units sharing an
/// identity key.
#[derive(Debug, Clone)]
pub struct ParentRow {
    pub handle: String,
    pub title: String,
    pub body_html: String,
    pub vendor: String,
    pub product_category: String,
    pub product_type: String,
    pub published: String,
    pub collection: Option<String>,
    pub option1_name: String,
    pub option1_value: String,
    pub option1_linked_to: String,
    pub option2_name: String,
    pub option2_value: String,
    pub option3_name: String,
    pub option3_value: String,
    pub option3_linked_to: String,
    pub variant_sku: String,
    pub inventory_tracker: String,
    pub inventory_qty: String,
    pub inventory_policy: String,
    pub fulfillment_service: String,
    pub price: String,
    pub image_src: String,
    pub image_position: String,
    pub color_metafield: Option<String>,
    pub size_metafield: Option<String>,
    pub variant_image: String,
    pub weight_unit: String,
    pub status: String,
}

/// Per-variant fields carried by attribute-mode child rows. Position-mode
/// children carry only handle, image source and position.
#[derive(Debug, Clone)]
pub struct ChildVariant {
    pub option1_value: String,
    pub option2_value: String,
    pub option3_value: String,
    pub variant_sku: String,
    pub inventory_tracker: String,
    pub inventory_qty: String,
    pub inventory_policy: String,
    pub fulfillment_service: String,
    pub price: String,
    pub variant_image: String,
    pub weight_unit: String,
}

#[derive(Debug, Clone)]
pub struct ChildRow {
    pub handle: String,
    pub image_src: String,
    pub image_position: String,
    pub variant: Option<ChildVariant>,
}

#[derive(Debug, Clone)]
pub enum Row {
    Parent(ParentRow),
    Child(ChildRow),
}

impl Row {
    /// Project one named column out of the row. Columns a variant does not
    /// carry render as empty cells.
    pub fn get(&self, column: &str) -> String {
        match self {
            Row::Parent(p) => p.get(column),
            Row::Child(c) => c.get(column),
        }
    }

    /// Non-empty image URLs referenced by this row, for link validation.
    pub fn links(&self) -> Vec<&str> {
        let (src, variant) = match self {
            Row::Parent(p) => (p.image_src.as_str(), p.variant_image.as_str()),
            Row::Child(c) => (
                c.image_src.as_str(),
                c.variant
                    .as_ref()
                    .map(|v| v.variant_image.as_str())
                    .unwrap_or(""),
            ),
        };
        [src, variant].into_iter().filter(|l| !l.is_empty()).collect()
    }
}

impl ParentRow {
    fn get(&self, column: &str) -> String {
        match column {
            "Handle" => self.handle.clone(),
            "Title" => self.title.clone(),
            "Body (HTML)" => self.body_html.clone(),
            "Vendor" => self.vendor.clone(),
            "Product Category" => self.product_category.clone(),
            "Type" => self.product_type.clone(),
            "Published" => self.published.clone(),
            "Collection" => self.collection.clone().unwrap_or_default(),
            "Option1 Name" => self.option1_name.clone(),
            "Option1 Value" => self.option1_value.clone(),
            "Option1 Linked To" => self.option1_linked_to.clone(),
            "Option2 Name" => self.option2_name.clone(),
            "Option2 Value" => self.option2_value.clone(),
            "Option3 Name" => self.option3_name.clone(),
            "Option3 Value" => self.option3_value.clone(),
            "Option3 Linked To" => self.option3_linked_to.clone(),
            "Variant SKU" => self.variant_sku.clone(),
            "Variant Grams" => "0".to_string(),
            "Variant Inventory Tracker" => self.inventory_tracker.clone(),
            "Variant Inventory Qty" => self.inventory_qty.clone(),
            "Variant Inventory Policy" => self.inventory_policy.clone(),
            "Variant Fulfillment Service" => self.fulfillment_service.clone(),
            "Variant Price" => self.price.clone(),
            "Variant Requires Shipping" => "TRUE".to_string(),
            "Variant Taxable" => "TRUE".to_string(),
            "Image Src" => self.image_src.clone(),
            "Image Position" => self.image_position.clone(),
            "Gift Card" => "FALSE".to_string(),
            "Color (product.metafields.shopify.color-pattern)" => {
                self.color_metafield.clone().unwrap_or_default()
            }
            "Size (product.metafields.shopify.size)" => {
                self.size_metafield.clone().unwrap_or_default()
            }
            "Variant Image" => self.variant_image.clone(),
            "Variant Weight Unit" => self.weight_unit.clone(),
            "Included / United States" => "TRUE".to_string(),
            "Included / International" => "TRUE".to_string(),
            "Status" => self.status.clone(),
            // Tags, SEO, Google Shopping, barcode, tax code, per-market
            // prices: always empty in this feed.
            _ => String::new(),
        }
    }
}

impl ChildRow {
    fn get(&self, column: &str) -> String {
        if let Some(v) = &self.variant {
            match column {
                "Option1 Value" => return v.option1_value.clone(),
                "Option2 Value" => return v.option2_value.clone(),
                "Option3 Value" => return v.option3_value.clone(),
                "Variant SKU" => return v.variant_sku.clone(),
                "Variant Grams" => return "0".to_string(),
                "Variant Inventory Tracker" => return v.inventory_tracker.clone(),
                "Variant Inventory Qty" => return v.inventory_qty.clone(),
                "Variant Inventory Policy" => return v.inventory_policy.clone(),
                "Variant Fulfillment Service" => return v.fulfillment_service.clone(),
                "Variant Price" => return v.price.clone(),
                "Variant Requires Shipping" => return "TRUE".to_string(),
                "Variant Taxable" => return "TRUE".to_string(),
                "Variant Image" => return v.variant_image.clone(),
                "Variant Weight Unit" => return v.weight_unit.clone(),
                _ => {}
            }
        }
        match column {
            "Handle" => self.handle.clone(),
            "Image Src" => self.image_src.clone(),
            "Image Position" => self.image_position.clone(),
            _ => String::new(),
        }
    }
}

/// Compose a hosted image URL: percent-encoded filename plus a cache-busting
/// freshness parameter. Pure function of its inputs.
pub fn image_link(host: &str, image_name: &str, timestamp: u64) -> String {
    format!("{}{}?v={}", host, urlencoding::encode(image_name), timestamp)
}

/// Variant SKU from truncated identity tokens, e.g. "Foo" / "Black" /
/// "T-shirt" / "m" -> "Foo-Bl-T--m".
pub fn make_sku(title: &str, color: &str, style: &str, size: &str) -> String {
    fn take(s: &str, n: usize) -> String {
        s.chars().take(n).collect()
    }
    format!(
        "{}-{}-{}-{}",
        take(title, 4),
        take(color, 2),
        take(style, 2),
        size
    )
}

/// Stateful fold turning (entry, unit) pairs into rows. Carries the last
/// identity key written to decide parent vs. child, and a single timestamp so
/// every link in one run shares the same freshness parameter epoch.
pub struct Synthesizer<'a> {
    config: &'a Config,
    body_html: String,
    timestamp: u64,
    last_key: Option<String>,
}

impl<'a> Synthesizer<'a> {
    pub fn new(config: &'a Config, body_html: String) -> Self {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        Self::with_timestamp(config, body_html, timestamp)
    }

    pub fn with_timestamp(config: &'a Config, body_html: String, timestamp: u64) -> Self {
        Self {
            config,
            body_html,
            timestamp,
            last_key: None,
        }
    }

    pub fn synthesize(&mut self, entry: &CatalogEntry, unit: &Unit) -> Row {
        let key = entry.identity_key(self.config.identity);
        let is_parent = self.last_key.as_deref() != Some(key.as_str());
        self.last_key = Some(key);

        match &unit.kind {
            UnitKind::Position { camera } => self.position_row(entry, unit.index, camera, is_parent),
            UnitKind::Attributes {
                color_token,
                color_label,
                style_label,
                size,
                image_shot,
                variant_shot,
                ..
            } => self.attribute_row(
                entry,
                is_parent,
                color_token,
                color_label,
                style_label,
                size,
                image_shot.as_ref(),
                variant_shot,
            ),
        }
    }

    fn shot_link(&self, title: &str, shot: &Shot) -> String {
        let image_name = format!(
            "{}_{}_{}_{}.png",
            title, shot.style_token, shot.color_label, shot.camera
        );
        image_link(&self.config.image_host_url, &image_name, self.timestamp)
    }

    fn position_row(
        &self,
        entry: &CatalogEntry,
        index: usize,
        camera: &str,
        is_parent: bool,
    ) -> Row {
        let image_name = format!("{}_{}_{}.png", entry.title, entry.type_token, camera);
        let image_src = image_link(&self.config.image_host_url, &image_name, self.timestamp);

        if !is_parent {
            return Row::Child(ChildRow {
                handle: entry.handle.clone(),
                image_src,
                image_position: index.to_string(),
                variant: None,
            });
        }

        let fixed = &self.config.fixed;
        Row::Parent(ParentRow {
            handle: entry.handle.clone(),
            title: entry.title.clone(),
            body_html: self.body_html.clone(),
            vendor: fixed.vendor.clone(),
            product_category: fixed.product_category.clone(),
            product_type: entry.type_token.clone(),
            published: fixed.published.clone(),
            collection: entry
                .collection_date
                .map(|d| d.format("%B %Y").to_string()),
            option1_name: "Title".to_string(),
            option1_value: "Default Title".to_string(),
            option1_linked_to: String::new(),
            option2_name: String::new(),
            option2_value: String::new(),
            option3_name: String::new(),
            option3_value: String::new(),
            option3_linked_to: String::new(),
            variant_sku: String::new(),
            inventory_tracker: fixed.inventory_tracker.clone(),
            inventory_qty: fixed.inventory_qty.clone(),
            inventory_policy: fixed.inventory_policy.clone(),
            fulfillment_service: fixed.fulfillment_service.clone(),
            price: fixed.default_price.clone(),
            image_src,
            image_position: index.to_string(),
            color_metafield: None,
            size_metafield: None,
            variant_image: String::new(),
            weight_unit: fixed.weight_unit.clone(),
            status: fixed.status.clone(),
        })
    }

    #[allow(clippy::too_many_arguments)]
    fn attribute_row(
        &self,
        entry: &CatalogEntry,
        is_parent: bool,
        color_token: &str,
        color_label: &str,
        style_label: &str,
        size: &str,
        image_shot: Option<&Shot>,
        variant_shot: &Shot,
    ) -> Row {
        let image_src = image_shot
            .map(|shot| self.shot_link(&entry.title, shot))
            .unwrap_or_default();
        let variant_image = self.shot_link(&entry.title, variant_shot);
        let variant_sku = if self.config.generate_skus {
            make_sku(&entry.title, color_label, style_label, size)
        } else {
            String::new()
        };

        let fixed = &self.config.fixed;
        if !is_parent {
            return Row::Child(ChildRow {
                handle: entry.handle.clone(),
                image_src,
                image_position: String::new(),
                variant: Some(ChildVariant {
                    option1_value: color_token.to_string(),
                    option2_value: style_label.to_string(),
                    option3_value: size.to_string(),
                    variant_sku,
                    inventory_tracker: fixed.inventory_tracker.clone(),
                    inventory_qty: fixed.inventory_qty.clone(),
                    inventory_policy: fixed.inventory_policy.clone(),
                    fulfillment_service: fixed.fulfillment_service.clone(),
                    price: self.config.price_for(style_label).to_string(),
                    variant_image,
                    weight_unit: fixed.weight_unit.clone(),
                }),
            });
        }

        Row::Parent(ParentRow {
            handle: entry.handle.clone(),
            title: entry.title.clone(),
            body_html: self.body_html.clone(),
            vendor: fixed.vendor.clone(),
            product_category: fixed.product_category.clone(),
            product_type: style_label.to_string(),
            published: fixed.published.clone(),
            collection: None,
            option1_name: "Color".to_string(),
            option1_value: color_token.to_string(),
            option1_linked_to: fixed.color_option_link.clone(),
            option2_name: "Type".to_string(),
            option2_value: style_label.to_string(),
            option3_name: "Size".to_string(),
            option3_value: size.to_string(),
            option3_linked_to: fixed.size_option_link.clone(),
            variant_sku,
            inventory_tracker: fixed.inventory_tracker.clone(),
            inventory_qty: fixed.inventory_qty.clone(),
            inventory_policy: fixed.inventory_policy.clone(),
            fulfillment_service: fixed.fulfillment_service.clone(),
            price: self.config.price_for(style_label).to_string(),
            image_src,
            image_position: String::new(),
            color_metafield: Some(self.config.color_metafield()),
            size_metafield: Some(self.config.size_metafield()),
            variant_image,
            weight_unit: fixed.weight_unit.clone(),
            status: fixed.status.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expand::expand;

    fn position_entry(title: &str, type_token: &str) -> CatalogEntry {
        CatalogEntry {
            filename: format!("{}_{}_CamGallery.png", title, type_token),
            handle: title.to_lowercase(),
            title: title.to_string(),
            type_token: type_token.to_string(),
            color: None,
            collection_date: chrono::NaiveDate::from_ymd_opt(2023, 10, 5),
        }
    }

    #[test]
    fn test_first_unit_is_parent_rest_are_children() {
        let config = Config::default();
        let mut synth = Synthesizer::with_timestamp(&config, String::new(), 1_700_000_000);
        let entry = position_entry("Acme", "Hoodie");

        let rows: Vec<Row> = expand(&entry, &config)
            .map(|unit| synth.synthesize(&entry, &unit))
            .collect();

        assert_eq!(rows.len(), 4);
        assert!(matches!(rows[0], Row::Parent(_)));
        assert!(rows[1..].iter().all(|r| matches!(r, Row::Child(_))));
    }

    #[test]
    fn test_parent_row_fields_position_mode() {
        let config = Config::default();
        let mut synth = Synthesizer::with_timestamp(&config, String::new(), 1_700_000_000);
        let entry = position_entry("Acme", "Hoodie");
        let units: Vec<Unit> = expand(&entry, &config).collect();

        let row = synth.synthesize(&entry, &units[0]);
        assert_eq!(row.get("Handle"), "acme");
        assert_eq!(row.get("Title"), "Acme");
        assert_eq!(row.get("Type"), "Hoodie");
        assert_eq!(row.get("Image Position"), "1");
        assert_eq!(row.get("Collection"), "October 2023");
        assert_eq!(row.get("Option1 Value"), "Default Title");
        assert_eq!(row.get("Variant Price"), "485");
        assert_eq!(row.get("Status"), "active");
        assert_eq!(
            row.get("Image Src"),
            format!(
                "{}Acme_Hoodie_CamGallery.png?v=1700000000",
                config.image_host_url
            )
        );
    }

    #[test]
    fn test_child_row_leaves_parent_columns_empty() {
        let config = Config::default();
        let mut synth = Synthesizer::with_timestamp(&config, String::new(), 1_700_000_000);
        let entry = position_entry("Acme", "Hoodie");
        let units: Vec<Unit> = expand(&entry, &config).collect();

        synth.synthesize(&entry, &units[0]);
        let child = synth.synthesize(&entry, &units[1]);
        assert_eq!(child.get("Handle"), "acme");
        assert_eq!(child.get("Image Position"), "2");
        assert!(!child.get("Image Src").is_empty());
        for column in ["Title", "Vendor", "Variant Price", "Status", "Collection"] {
            assert_eq!(child.get(column), "", "column {} should be empty", column);
        }
    }

    #[test]
    fn test_new_key_after_intervening_key_reemits_parent() {
        // The fold keeps only the last key, so re-entering a key after a
        // different one starts a new parent run.
        let config = Config::default();
        let mut synth = Synthesizer::with_timestamp(&config, String::new(), 1_700_000_000);
        let a = position_entry("Acme", "Hoodie");
        let b = position_entry("Bolt", "Poster");
        let unit = expand(&a, &config).next().unwrap();

        assert!(matches!(synth.synthesize(&a, &unit), Row::Parent(_)));
        assert!(matches!(synth.synthesize(&b, &unit), Row::Parent(_)));
        assert!(matches!(synth.synthesize(&a, &unit), Row::Parent(_)));
        assert!(matches!(synth.synthesize(&a, &unit), Row::Child(_)));
    }

    #[test]
    fn test_attribute_rows() {
        let config = Config::apparel();
        let mut synth = Synthesizer::with_timestamp(&config, "body".to_string(), 1_700_000_000);
        let entry = CatalogEntry {
            filename: "Foo_tshirt_black_CamClose.png".to_string(),
            handle: "foo".to_string(),
            title: "Foo".to_string(),
            type_token: "tshirt".to_string(),
            color: Some("black".to_string()),
            collection_date: None,
        };
        let rows: Vec<Row> = expand(&entry, &config)
            .map(|unit| synth.synthesize(&entry, &unit))
            .collect();

        assert_eq!(rows.len(), 36);
        let parent = &rows[0];
        assert!(matches!(parent, Row::Parent(_)));
        assert_eq!(parent.get("Body (HTML)"), "body");
        assert_eq!(parent.get("Option1 Name"), "Color");
        assert_eq!(parent.get("Option1 Value"), "black");
        assert_eq!(parent.get("Option2 Value"), "T-shirt");
        assert_eq!(parent.get("Option3 Value"), "xs");
        assert_eq!(
            parent.get("Color (product.metafields.shopify.color-pattern)"),
            "black; silver"
        );
        assert_eq!(
            parent.get("Size (product.metafields.shopify.size)"),
            "xs; s; m; l; xl; 2xl"
        );
        // (black, tshirt, xs) maps to the black t-shirt close-up.
        assert_eq!(
            parent.get("Image Src"),
            format!(
                "{}Foo_tshirt_Black_CamClose.png?v=1700000000",
                config.image_host_url
            )
        );

        let child = &rows[1];
        assert!(matches!(child, Row::Child(_)));
        assert_eq!(child.get("Option3 Value"), "s");
        assert_eq!(child.get("Variant Price"), "20");
        assert_eq!(child.get("Variant Inventory Qty"), "50");
        assert_eq!(child.get("Title"), "");

        // An unmapped combination carries an empty image reference but still
        // a variant image.
        let unmapped = &rows[7];
        assert_eq!(unmapped.get("Image Src"), "");
        assert!(!unmapped.get("Variant Image").is_empty());
    }

    #[test]
    fn test_image_link_round_trips_through_percent_encoding() {
        let link = image_link(
            "https://gsimagehost.com/skullz/",
            "Foo Bar_tshirt_Black_CamFull.png",
            42,
        );
        assert_eq!(
            link,
            "https://gsimagehost.com/skullz/Foo%20Bar_tshirt_Black_CamFull.png?v=42"
        );
        let encoded = link
            .strip_prefix("https://gsimagehost.com/skullz/")
            .unwrap()
            .strip_suffix("?v=42")
            .unwrap();
        assert_eq!(
            urlencoding::decode(encoded).unwrap(),
            "Foo Bar_tshirt_Black_CamFull.png"
        );
    }

    #[test]
    fn test_make_sku_truncates_tokens() {
        assert_eq!(make_sku("Skullface", "Black", "T-shirt", "xl"), "Skul-Bl-T--xl");
        // Short tokens survive unchanged.
        assert_eq!(make_sku("Ab", "B", "S", "m"), "Ab-B-S-m");
    }
}
