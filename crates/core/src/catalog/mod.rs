//! Compiled-in reference catalogs used by quotes, clients and tax documents.

mod data;

use serde::Serialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct CatalogEntry {
    pub code: &'static str,
    pub name: &'static str,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Municipality {
    pub department: &'static str,
    pub code: &'static str,
    pub name: &'static str,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CatalogKind {
    Departments,
    IdentityDocuments,
    UnitsOfMeasure,
    PaymentForms,
    DteTypes,
    ItemTypes,
    EconomicActivities,
}

impl CatalogKind {
    pub const ALL: [CatalogKind; 7] = [
        CatalogKind::Departments,
        CatalogKind::IdentityDocuments,
        CatalogKind::UnitsOfMeasure,
        CatalogKind::PaymentForms,
        CatalogKind::DteTypes,
        CatalogKind::ItemTypes,
        CatalogKind::EconomicActivities,
    ];

    /// Path segment used by the REST surface.
    pub fn slug(&self) -> &'static str {
        match self {
            CatalogKind::Departments => "departments",
            CatalogKind::IdentityDocuments => "identity-documents",
            CatalogKind::UnitsOfMeasure => "units-of-measure",
            CatalogKind::PaymentForms => "payment-forms",
            CatalogKind::DteTypes => "dte-types",
            CatalogKind::ItemTypes => "item-types",
            CatalogKind::EconomicActivities => "economic-activities",
        }
    }

    pub fn from_slug(slug: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.slug() == slug)
    }

    pub fn entries(&self) -> &'static [CatalogEntry] {
        match self {
            CatalogKind::Departments => data::DEPARTMENTS,
            CatalogKind::IdentityDocuments => data::IDENTITY_DOCUMENTS,
            CatalogKind::UnitsOfMeasure => data::UNITS_OF_MEASURE,
            CatalogKind::PaymentForms => data::PAYMENT_FORMS,
            CatalogKind::DteTypes => data::DTE_TYPES,
            CatalogKind::ItemTypes => data::ITEM_TYPES,
            CatalogKind::EconomicActivities => data::ECONOMIC_ACTIVITIES,
        }
    }

    pub fn find(&self, code: &str) -> Option<&'static CatalogEntry> {
        let code = code.trim();
        self.entries().iter().find(|entry| entry.code == code)
    }
}

pub fn departments() -> &'static [CatalogEntry] {
    data::DEPARTMENTS
}

pub fn municipalities(department: &str) -> Vec<&'static Municipality> {
    data::MUNICIPALITIES.iter().filter(|entry| entry.department == department).collect()
}

pub fn all_municipalities() -> &'static [Municipality] {
    data::MUNICIPALITIES
}

pub fn find_municipality(department: &str, code: &str) -> Option<&'static Municipality> {
    data::MUNICIPALITIES.iter().find(|entry| entry.department == department && entry.code == code)
}

pub fn find_identity_document(code: &str) -> Option<&'static CatalogEntry> {
    CatalogKind::IdentityDocuments.find(code)
}

pub fn find_item_type(code: u8) -> Option<&'static CatalogEntry> {
    CatalogKind::ItemTypes.find(&code.to_string())
}

/// Case-insensitive match on code prefix or name fragment.
pub fn search_activities(term: &str) -> Vec<&'static CatalogEntry> {
    let term = term.trim().to_lowercase();
    if term.is_empty() {
        return data::ECONOMIC_ACTIVITIES.iter().collect();
    }
    data::ECONOMIC_ACTIVITIES
        .iter()
        .filter(|entry| entry.code.starts_with(&term) || entry.name.to_lowercase().contains(&term))
        .collect()
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::{
        all_municipalities, departments, find_identity_document, find_item_type,
        find_municipality, municipalities, search_activities, CatalogKind,
    };

    #[test]
    fn fourteen_departments_and_forty_four_municipalities() {
        assert_eq!(departments().len(), 14);
        assert_eq!(all_municipalities().len(), 44);

        let department_codes: HashSet<_> = departments().iter().map(|entry| entry.code).collect();
        assert!(all_municipalities().iter().all(|m| department_codes.contains(m.department)));
    }

    #[test]
    fn municipality_lookup_is_scoped_by_department() {
        let san_salvador = municipalities("06");
        assert_eq!(san_salvador.len(), 5);
        assert_eq!(
            find_municipality("06", "23").map(|m| m.name),
            Some("San Salvador Centro")
        );
        assert!(find_municipality("07", "23").is_none());
        assert!(municipalities("99").is_empty());
    }

    #[test]
    fn codes_are_unique_within_each_catalog() {
        for kind in CatalogKind::ALL {
            let codes: HashSet<_> = kind.entries().iter().map(|entry| entry.code).collect();
            assert_eq!(codes.len(), kind.entries().len(), "duplicate code in {}", kind.slug());
        }
    }

    #[test]
    fn slugs_resolve_back_to_kinds() {
        for kind in CatalogKind::ALL {
            assert_eq!(CatalogKind::from_slug(kind.slug()), Some(kind));
        }
        assert_eq!(CatalogKind::from_slug("currencies"), None);
    }

    #[test]
    fn finds_reference_codes() {
        assert_eq!(find_identity_document("13").map(|entry| entry.name), Some("DUI"));
        assert_eq!(find_item_type(2).map(|entry| entry.name), Some("Servicios"));
        assert!(find_item_type(9).is_none());
    }

    #[test]
    fn activity_search_matches_code_prefix_and_name() {
        let by_code = search_activities("620");
        assert_eq!(by_code.len(), 2);

        let by_name = search_activities("RESTAUR");
        assert_eq!(by_name.iter().map(|entry| entry.code).collect::<Vec<_>>(), vec!["56101"]);

        assert_eq!(search_activities("  ").len(), CatalogKind::EconomicActivities.entries().len());
    }
}
