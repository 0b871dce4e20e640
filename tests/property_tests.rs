/// Property-based tests using proptest
/// Tests invariants and properties that should hold for all inputs
use proptest::prelude::*;
use rolaju_api::contact::{escape_html, format_phone, is_valid_email};
use rolaju_api::models::{Coordinates, PlaceRecord};
use rolaju_api::nominatim_models::NominatimAddress;
use rolaju_api::places::{group_places, CATEGORY_LABELS};

// Property: Email validation should never panic
proptest! {
    #[test]
    fn email_validation_never_panics(email in "\\PC*") {
        let _ = is_valid_email(&email);
    }

    #[test]
    fn simple_emails_are_accepted(
        local in "[a-z]{1,10}",
        domain in "[a-z]{1,10}",
        tld in "[a-z]{2,4}"
    ) {
        let email = format!("{}@{}.{}", local, domain, tld);
        prop_assert!(is_valid_email(&email));
    }

    #[test]
    fn emails_without_at_are_rejected(text in "[a-z0-9.]{0,30}") {
        prop_assert!(!is_valid_email(&text));
    }
}

// Property: Submitted text can never inject markup into the email body
proptest! {
    #[test]
    fn escaped_html_has_no_markup(raw in "\\PC*") {
        let escaped = escape_html(&raw);
        prop_assert!(!escaped.contains('<'));
        prop_assert!(!escaped.contains('>'));
        prop_assert!(!escaped.contains('"'));
    }

    #[test]
    fn plain_text_is_unchanged(raw in "[a-zA-Z0-9 ,.!?áéíóúãõç]*") {
        prop_assert_eq!(escape_html(&raw), raw);
    }

    #[test]
    fn phone_formatting_never_panics(phone in "\\PC*") {
        let _ = format_phone(&phone);
    }
}

// Property: Synthesized Nominatim addresses
proptest! {
    #[test]
    fn synthesized_address_contains_every_component(
        road in "[A-Z][a-z]{2,12}",
        number in "[1-9][0-9]{0,3}",
        suburb in "[A-Z][a-z]{2,12}",
    ) {
        let address = NominatimAddress {
            road: Some(format!("Rua {}", road)),
            house_number: Some(number.clone()),
            suburb: Some(format!("Bairro {}", suburb)),
            city_district: None,
            city: Some("Aracaju".to_string()),
        };

        let formatted = address.synthesize();
        let expected_prefix = format!("Rua {}, {}", road, number);
        let expected_suburb = format!("Bairro {}", suburb);
        prop_assert!(formatted.starts_with(&expected_prefix));
        prop_assert!(formatted.contains(&expected_suburb));
        prop_assert!(formatted.ends_with("Aracaju"));
        prop_assert!(!formatted.starts_with(", "));
        prop_assert!(!formatted.ends_with(", "));
    }

    #[test]
    fn suburb_equal_to_city_is_not_repeated(name in "[A-Z][a-z]{3,12}") {
        let address = NominatimAddress {
            road: None,
            house_number: None,
            suburb: Some(name.clone()),
            city_district: None,
            city: Some(name.clone()),
        };

        prop_assert_eq!(address.synthesize(), name);
    }
}

fn place(name: String, category: &str, longitude: f64) -> PlaceRecord {
    PlaceRecord {
        name,
        formatted_address: String::new(),
        full_address: String::new(),
        categories: vec![category.to_string()],
        external_id: String::new(),
        coordinates: Coordinates::new(longitude, -10.9),
        phone: None,
        website: None,
        open_now: None,
    }
}

// Property: Map aggregation keeps names unique and every group present
proptest! {
    #[test]
    fn grouped_places_have_unique_names(
        entries in prop::collection::vec(("[a-e]{1,2}", 0usize..6), 0..40)
    ) {
        let places = entries
            .iter()
            .map(|(name, idx)| place(name.clone(), CATEGORY_LABELS[*idx].0, -37.05));

        let aggregate = group_places(places);

        let mut names: Vec<&str> = aggregate.places.iter().map(|p| p.name.as_str()).collect();
        let total = names.len();
        names.sort_unstable();
        names.dedup();
        prop_assert_eq!(names.len(), total);

        prop_assert_eq!(aggregate.groups.len(), CATEGORY_LABELS.len());
        let grouped: usize = aggregate.groups.values().map(Vec::len).sum();
        prop_assert_eq!(grouped, total);
    }
}
