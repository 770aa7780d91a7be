//! The static endpoint registry.
//!
//! Descriptors are built on first use and live for the rest of the process.
//! Registry order is sync order.

use crate::config::SyncConfig;
use crate::error::{SyncError, SyncResult};
use std::sync::OnceLock;
use wporg_protocol::{
    EndpointDescriptor, FieldType, NormalizationRules, Pagination, Property, RecordSelector,
    ReplicationOrder, Reshape, Schema,
};

/// Items requested per page on paged endpoints.
pub const PAGE_SIZE: u64 = 100;

static REGISTRY: OnceLock<Vec<EndpointDescriptor>> = OnceLock::new();

/// Returns every known endpoint, in sync order.
pub fn all() -> &'static [EndpointDescriptor] {
    REGISTRY.get_or_init(build)
}

/// Looks up an endpoint by name.
pub fn find(name: &str) -> Option<&'static EndpointDescriptor> {
    all().iter().find(|d| d.name == name)
}

/// Returns the endpoints selected by `config`, in registry order.
///
/// Fails with [`SyncError::UnknownEndpoint`] if the allowlist names an
/// endpoint the registry does not know.
pub fn select(config: &SyncConfig) -> SyncResult<Vec<&'static EndpointDescriptor>> {
    if let Some(names) = &config.endpoint_allowlist {
        if let Some(unknown) = names.iter().find(|n| find(n).is_none()) {
            return Err(SyncError::UnknownEndpoint(unknown.clone()));
        }
    }
    Ok(all().iter().filter(|d| config.is_selected(d.name)).collect())
}

fn build() -> Vec<EndpointDescriptor> {
    vec![
        plugins(),
        themes(),
        events(),
        patterns(),
        stats("wordpress_stats", "/stats/wordpress/1.0/", "version", "WordPress version"),
        stats("php_stats", "/stats/php/1.0/", "version", "PHP version"),
        stats("mysql_stats", "/stats/mysql/1.0/", "version", "MySQL version"),
        stats("locale_stats", "/stats/locale/1.0/", "locale", "Locale code"),
    ]
}

fn text(name: &'static str, description: &'static str) -> Property {
    Property::new(name, FieldType::String, description)
}

fn object_or_array(name: &'static str, description: &'static str) -> Property {
    Property::any_of(name, &[FieldType::Object, FieldType::Array], description)
}

fn plugins() -> EndpointDescriptor {
    EndpointDescriptor::new(
        "plugins",
        "/plugins/info/1.2/",
        RecordSelector::items_of("plugins"),
        Schema::new(vec![
            text("slug", "Plugin slug"),
            text("name", "Plugin name"),
            text("short_description", "Short description"),
            text("author", "Plugin author"),
            text("author_profile", "Author profile URL"),
            object_or_array("contributors", "Contributors"),
            text("requires", "Minimum WordPress version"),
            text("tested", "Tested up to WordPress version"),
            text("requires_php", "Minimum PHP version"),
            Property::new("rating", FieldType::Number, "Plugin rating"),
            object_or_array("ratings", "Rating breakdown"),
            Property::new("num_ratings", FieldType::Integer, "Number of ratings"),
            Property::new("active_installs", FieldType::Integer, "Active installations"),
            Property::new("downloaded", FieldType::Integer, "Total downloads"),
            text("last_updated", "Last update date"),
            text("added", "Date added"),
            text("homepage", "Plugin homepage"),
            Property::new("sections", FieldType::Object, "Plugin sections"),
            object_or_array("tags", "Plugin tags"),
            Property::new("versions", FieldType::Object, "Available versions"),
            text("donate_link", "Donation link"),
            text("download_link", "Download link"),
        ]),
    )
    .with_primary_keys(&["slug"])
    .with_replication_key("last_updated", ReplicationOrder::Descending)
    .with_pagination(Pagination::PageNumber { param: "page" })
    .with_param("action", "query_plugins")
    .with_param("per_page", "100")
    .with_param("browse", "updated")
    .with_normalization(NormalizationRules {
        decode_entities: vec!["name", "short_description"],
        version_like: vec!["requires_php", "requires", "tested"],
        zero_dates: vec!["last_updated"],
    })
}

fn themes() -> EndpointDescriptor {
    EndpointDescriptor::new(
        "themes",
        "/themes/info/1.2/",
        RecordSelector::items_of("themes"),
        Schema::new(vec![
            text("slug", "Theme slug"),
            text("name", "Theme name"),
            text("version", "Theme version"),
            text("preview_url", "Preview URL"),
            Property::new("author", FieldType::Object, "Theme author"),
            text("screenshot_url", "Screenshot URL"),
            Property::new("rating", FieldType::Number, "Theme rating"),
            Property::new("num_ratings", FieldType::Integer, "Number of ratings"),
            Property::new("downloaded", FieldType::Integer, "Total downloads"),
            text("last_updated", "Last update date"),
            text("last_updated_time", "Last update timestamp"),
            text("homepage", "Theme homepage"),
            Property::new("sections", FieldType::Object, "Theme sections"),
            Property::new("tags", FieldType::Object, "Theme tags"),
            text("download_link", "Download link"),
            text("parent", "Parent theme slug"),
            text("requires", "Minimum WordPress version"),
            text("requires_php", "Minimum PHP version"),
        ]),
    )
    .with_primary_keys(&["slug"])
    .with_replication_key("last_updated_time", ReplicationOrder::Descending)
    .with_pagination(Pagination::PageNumber {
        param: "request[page]",
    })
    .with_param("action", "query_themes")
    .with_param("request[per_page]", "100")
    .with_param("request[browse]", "updated")
    .with_param("request[fields][last_updated]", "true")
    .with_normalization(NormalizationRules {
        decode_entities: vec!["name"],
        version_like: vec!["requires_php", "requires"],
        zero_dates: vec!["last_updated"],
    })
}

fn events() -> EndpointDescriptor {
    EndpointDescriptor::new(
        "events",
        "/events/1.0/",
        RecordSelector::items_of("events"),
        Schema::new(vec![
            text("id", "Event ID"),
            text("title", "Event title"),
            text("url", "Event URL"),
            Property::object(
                "location",
                vec![
                    Property::new("latitude", FieldType::Number, ""),
                    Property::new("longitude", FieldType::Number, ""),
                    text("country", ""),
                    text("location", ""),
                ],
                "Event location",
            ),
            text("date", "Event date"),
            text("end_date", "Event end date"),
            text("type", "Event type"),
        ]),
    )
    .with_primary_keys(&["id"])
    .with_param("number", "100")
}

fn patterns() -> EndpointDescriptor {
    let rendered = || vec![text("raw", ""), text("rendered", "")];
    EndpointDescriptor::new(
        "patterns",
        "/patterns/1.0/",
        RecordSelector::items_of("patterns"),
        Schema::new(vec![
            Property::new("id", FieldType::Integer, "Pattern ID"),
            Property::object("title", rendered(), "Pattern title"),
            Property::object("content", rendered(), "Pattern content"),
            Property::array_of("categories", FieldType::Integer, "Category IDs"),
            Property::array_of("keywords", FieldType::Integer, "Keyword IDs"),
            Property::object(
                "pattern_meta",
                vec![Property::new("viewport_width", FieldType::Integer, "")],
                "Pattern metadata",
            ),
            Property::array_of("category_slugs", FieldType::String, "Category slugs"),
            Property::array_of("keyword_slugs", FieldType::String, "Keyword slugs"),
            Property::object(
                "meta",
                vec![
                    text("author_name", ""),
                    text("author_username", ""),
                    Property::new("is_web_only", FieldType::Boolean, ""),
                ],
                "Pattern metadata",
            ),
        ]),
    )
    .with_primary_keys(&["id"])
    .with_pagination(Pagination::OffsetCount {
        param: "offset",
        page_size: PAGE_SIZE,
    })
    .with_param("per_page", "100")
}

fn stats(
    name: &'static str,
    path: &'static str,
    label: &'static str,
    label_description: &'static str,
) -> EndpointDescriptor {
    EndpointDescriptor::new(
        name,
        path,
        RecordSelector::root_items(),
        Schema::new(vec![
            text(label, label_description),
            Property::new("count", FieldType::Integer, "Number of installations"),
            Property::new("percent", FieldType::Number, "Percentage of total installations"),
        ]),
    )
    .with_primary_keys(&[label])
    .with_reshape(Reshape::CountsMap)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wporg_protocol::PageToken;

    #[test]
    fn registry_order_and_lookup() {
        let names: Vec<&str> = all().iter().map(|d| d.name).collect();
        assert_eq!(
            names,
            vec![
                "plugins",
                "themes",
                "events",
                "patterns",
                "wordpress_stats",
                "php_stats",
                "mysql_stats",
                "locale_stats",
            ]
        );
        assert_eq!(find("locale_stats").map(|d| d.primary_keys.clone()), Some(vec!["locale"]));
        assert!(find("comments").is_none());
    }

    #[test]
    fn incremental_endpoints() {
        let incremental: Vec<&str> = all()
            .iter()
            .filter(|d| d.is_incremental())
            .map(|d| d.name)
            .collect();
        assert_eq!(incremental, vec!["plugins", "themes"]);
        assert!(all().iter().filter(|d| d.is_incremental()).all(|d| d.early_stop_enabled()));
    }

    #[test]
    fn every_primary_key_is_declared() {
        for d in all() {
            for key in &d.primary_keys {
                assert!(d.schema.contains(key), "{} does not declare {}", d.name, key);
            }
            if let Some(key) = d.replication_key {
                assert!(d.schema.contains(key));
            }
        }
    }

    #[test]
    fn themes_page_parameter() {
        let themes = find("themes").unwrap();
        let params = themes.request_params(Some(PageToken::Page(4)));
        assert!(params.contains(&("request[page]".to_string(), "4".to_string())));
        assert!(params.contains(&("action".to_string(), "query_themes".to_string())));
    }

    #[test]
    fn selection_honours_allowlist() {
        let config = SyncConfig::default().with_endpoints(["php_stats", "plugins"]);
        let names: Vec<&str> = select(&config).unwrap().iter().map(|d| d.name).collect();
        assert_eq!(names, vec!["plugins", "php_stats"]);

        assert_eq!(select(&SyncConfig::default()).unwrap().len(), 8);
    }

    #[test]
    fn unknown_allowlist_entry_is_an_error() {
        let config = SyncConfig::default().with_endpoints(["plugins", "comments"]);
        match select(&config) {
            Err(SyncError::UnknownEndpoint(name)) => assert_eq!(name, "comments"),
            other => panic!("unexpected {other:?}"),
        }
    }
}
