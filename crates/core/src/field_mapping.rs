//! Static header-name tables used by the auto-mapper.
//!
//! A [`FieldMappingTable`] pairs exact header names with canonical keys
//! ("direct mappings") and lists alternative header spellings per key for
//! heuristic matching. The bundled [`DUTCH`] table is tuned for the column
//! headers Dutch practices export; another locale only needs another table.
//!
//! Order in [`FieldMappingTable::alternatives`] is significant: when a header
//! matches alternatives of several keys, the entry declared first wins.

/// Lookup data for header auto-detection.
#[derive(Debug, Clone, Copy)]
pub struct FieldMappingTable {
    /// Exact (case-sensitive) header name to canonical key.
    pub direct: &'static [(&'static str, &'static str)],
    /// Canonical key to alternative header names, lowercase, in priority order.
    pub alternatives: &'static [(&'static str, &'static [&'static str])],
}

impl FieldMappingTable {
    /// Exact lookup in the direct mappings.
    pub fn direct_target(&self, header: &str) -> Option<&'static str> {
        self.direct
            .iter()
            .find(|(name, _)| *name == header)
            .map(|(_, key)| *key)
    }

    /// Alternative names declared for `key`, empty when none.
    pub fn alternatives_for(&self, key: &str) -> &'static [&'static str] {
        self.alternatives
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, alts)| *alts)
            .unwrap_or(&[])
    }
}

impl Default for FieldMappingTable {
    fn default() -> Self {
        DUTCH
    }
}

/// Header table for Dutch practice exports.
pub const DUTCH: FieldMappingTable = FieldMappingTable {
    direct: DUTCH_DIRECT,
    alternatives: DUTCH_ALTERNATIVES,
};

const DUTCH_DIRECT: &[(&str, &str)] = &[
    ("Voornaam", "first_name"),
    ("Achternaam", "last_name"),
    ("E-mailadres", "email"),
    ("E-mail", "email"),
    ("Email", "email"),
    ("Telefoonnummer", "phone"),
    ("Telefoon", "phone"),
    ("Mobiel", "phone"),
    ("Geboortedatum", "date_of_birth"),
    ("Geslacht", "gender"),
    ("BSN", "bsn"),
    ("Straat", "street"),
    ("Straatnaam", "street"),
    ("Huisnummer", "house_number"),
    ("Postcode", "postal_code"),
    ("Woonplaats", "city"),
    ("Plaats", "city"),
    ("Zorgverzekeraar", "insurance_company"),
    ("Verzekeraar", "insurance_company"),
    ("Polisnummer", "insurance_number"),
    ("Huisarts", "general_practitioner"),
    ("Opmerkingen", "notes"),
    ("Notities", "notes"),
    ("Specialisaties", "specializations"),
    ("BIG-nummer", "big_number"),
    ("AGB-code", "agb_code"),
    ("Biografie", "bio"),
    ("Uurtarief", "hourly_rate"),
    ("First Name", "first_name"),
    ("Last Name", "last_name"),
    ("Phone", "phone"),
    ("Date of Birth", "date_of_birth"),
];

const DUTCH_ALTERNATIVES: &[(&str, &[&str])] = &[
    (
        "first_name",
        &["voornaam", "roepnaam", "voorletters", "first name", "firstname", "given name"],
    ),
    (
        "last_name",
        &["achternaam", "familienaam", "tussenvoegsel", "last name", "lastname", "surname", "naam"],
    ),
    ("email", &["e-mailadres", "e-mail", "email", "mail"]),
    ("phone", &["telefoonnummer", "telefoon", "mobiel", "gsm", "phone"]),
    (
        "date_of_birth",
        &["geboortedatum", "geb. datum", "geboren", "date of birth", "birth", "dob"],
    ),
    ("gender", &["geslacht", "sekse", "gender"]),
    ("bsn", &["bsn", "burgerservicenummer", "sofinummer"]),
    ("street", &["straatnaam", "straat", "street", "adres"]),
    ("house_number", &["huisnummer", "huisnr", "house number"]),
    ("postal_code", &["postcode", "postal code", "zip"]),
    ("city", &["woonplaats", "plaats", "stad", "city"]),
    (
        "insurance_number",
        &["polisnummer", "verzekeringsnummer", "policy number", "insurance number"],
    ),
    ("insurance_company", &["zorgverzekeraar", "verzekeraar", "insurance"]),
    ("general_practitioner", &["huisarts", "general practitioner"]),
    ("notes", &["opmerkingen", "opmerking", "notities", "toelichting", "notes"]),
    (
        "specializations",
        &["specialisaties", "specialisatie", "specialisme", "specializations"],
    ),
    ("big_number", &["big-nummer", "big nummer", "bignummer", "big registratie"]),
    ("agb_code", &["agb-code", "agb code", "agb"]),
    ("license_expiry", &["verloopdatum", "geldig tot", "license expiry"]),
    ("bio", &["biografie", "over mij", "bio", "about"]),
    ("hourly_rate", &["uurtarief", "tarief", "hourly rate"]),
];
