//! Integration tests for the catalog module

#[cfg(test)]
mod integration_tests {
    use crate::catalog::{parser, ContributionListing, ContributionRecord, ContributionType};

    const CATALOG: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<contributions>
  <category name="Sound">
    <library name="Minim" url="http://code.compartmental.net/tools/minim">
      <author name="Damien Di Fede"/>
      <description sentence="Audio playback and synthesis"/>
      <version id="12" pretty="2.1.0"/>
      <location url="http://example.com/minim.zip"/>
    </library>
    <library name="beads">
      <author name="Ollie Bown"/>
      <version id="4" pretty="1.0"/>
    </library>
  </category>
  <category name="Video &amp; Vision">
    <library name="OpenCV">
      <description sentence="Computer vision"/>
      <version id="3"/>
    </library>
    <librarycompilation name="Vision Pack" libraryNames="OpenCV; BlobDetection">
      <version id="1"/>
    </librarycompilation>
  </category>
</contributions>"#;

    /// Parse a catalog, merge installed contributions, then query the result
    #[test]
    fn test_catalog_to_listing_flow() {
        let listing = ContributionListing::new();
        listing
            .set_advertised_list(parser::parse_str(CATALOG).unwrap())
            .unwrap();

        assert_eq!(listing.advertised_len(), 4);
        assert_eq!(
            listing.get_categories().into_iter().collect::<Vec<_>>(),
            vec!["Sound".to_string(), "Video & Vision".to_string()]
        );
        assert!(!listing.has_updates());

        // An old Minim is installed locally, without category information
        listing.update_installed_list(vec![
            ContributionRecord::library("Minim").with_version(10),
            ContributionRecord::library("LocalOnly").with_version(1),
        ]);

        assert_eq!(listing.len(), 5);
        assert!(listing.has_updates());

        let minim = listing
            .get_all_contributions()
            .into_iter()
            .find(|r| r.name == "Minim")
            .unwrap();
        assert!(minim.installed);
        assert_eq!(minim.category.as_deref(), Some("Sound"));
        assert_eq!(minim.advertised_version(), Some(12));

        let names = |records: Vec<std::sync::Arc<ContributionRecord>>| {
            records
                .iter()
                .map(|r| r.name.clone())
                .collect::<Vec<_>>()
        };

        assert_eq!(
            names(listing.get_contributions_by_category(Some("Sound"))),
            vec!["beads", "Minim"]
        );
        assert_eq!(
            names(listing.get_filtered_list(None, &["has:updates"])),
            vec!["Minim"]
        );
        assert_eq!(
            names(listing.get_filtered_list(None, &["is:installed"])),
            vec!["LocalOnly", "Minim"]
        );
        assert_eq!(
            names(listing.get_filtered_list(Some("Video & Vision"), &["not:installed", "vision"])),
            vec!["OpenCV", "Vision Pack"]
        );

        let pack = listing
            .get_advertised_contribution("Vision Pack", ContributionType::LibraryCompilation)
            .unwrap();
        assert_eq!(pack.member_library_names, vec!["OpenCV", "BlobDetection"]);
        assert!(listing
            .get_advertised_contribution("Vision Pack", ContributionType::Library)
            .is_none());
    }

    /// A second refresh keeps installed records and picks up new versions
    #[test]
    fn test_refresh_after_install() {
        let listing = ContributionListing::new();
        listing
            .set_advertised_list(parser::parse_str(CATALOG).unwrap())
            .unwrap();
        listing.update_installed_list(vec![ContributionRecord::library("Minim").with_version(12)]);
        assert!(!listing.has_updates());

        let newer = CATALOG.replace(r#"<version id="12" pretty="2.1.0"/>"#, r#"<version id="13"/>"#);
        listing
            .set_advertised_list(parser::parse_str(&newer).unwrap())
            .unwrap();

        assert_eq!(listing.len(), 4);
        assert!(listing.has_updates());
        let installed = listing.get_filtered_list(None, &["is:installed"]);
        assert_eq!(installed.len(), 1);
        assert_eq!(installed[0].version, 12);
    }
}
