//! Static geographic reference data.
//!
//! The tables are compiled in and indexed once on first use; nothing here is
//! mutated after start-up.

use lazy_static::lazy_static;
use std::collections::HashMap;

/// One ISO 3166-1 entry: alpha-2 code, short name, official name, common name.
/// Empty strings mean the variant does not exist for that country.
pub struct CountryEntry {
    pub alpha_2: &'static str,
    pub name: &'static str,
    pub official_name: &'static str,
    pub common_name: &'static str,
}

const fn country(
    alpha_2: &'static str,
    name: &'static str,
    official_name: &'static str,
    common_name: &'static str,
) -> CountryEntry {
    CountryEntry {
        alpha_2,
        name,
        official_name,
        common_name,
    }
}

impl CountryEntry {
    /// Every non-empty spelling of this country.
    pub fn name_variants(&self) -> impl Iterator<Item = &'static str> {
        [self.name, self.official_name, self.common_name]
            .into_iter()
            .filter(|n| !n.is_empty())
    }
}

pub const COUNTRIES: &[CountryEntry] = &[
    country("AW", "Aruba", "", ""),
    country("AF", "Afghanistan", "Islamic Republic of Afghanistan", ""),
    country("AO", "Angola", "Republic of Angola", ""),
    country("AI", "Anguilla", "", ""),
    country("AX", "Åland Islands", "", ""),
    country("AL", "Albania", "Republic of Albania", ""),
    country("AD", "Andorra", "Principality of Andorra", ""),
    country("AE", "United Arab Emirates", "", ""),
    country("AR", "Argentina", "Argentine Republic", ""),
    country("AM", "Armenia", "Republic of Armenia", ""),
    country("AS", "American Samoa", "", ""),
    country("AQ", "Antarctica", "", ""),
    country("TF", "French Southern Territories", "", ""),
    country("AG", "Antigua and Barbuda", "", ""),
    country("AU", "Australia", "", ""),
    country("AT", "Austria", "Republic of Austria", ""),
    country("AZ", "Azerbaijan", "Republic of Azerbaijan", ""),
    country("BI", "Burundi", "Republic of Burundi", ""),
    country("BE", "Belgium", "Kingdom of Belgium", ""),
    country("BJ", "Benin", "Republic of Benin", ""),
    country("BQ", "Bonaire, Sint Eustatius and Saba", "", ""),
    country("BF", "Burkina Faso", "", ""),
    country("BD", "Bangladesh", "People's Republic of Bangladesh", ""),
    country("BG", "Bulgaria", "Republic of Bulgaria", ""),
    country("BH", "Bahrain", "Kingdom of Bahrain", ""),
    country("BS", "Bahamas", "Commonwealth of the Bahamas", ""),
    country("BA", "Bosnia and Herzegovina", "Republic of Bosnia and Herzegovina", ""),
    country("BL", "Saint Barthélemy", "", ""),
    country("BY", "Belarus", "Republic of Belarus", ""),
    country("BZ", "Belize", "", ""),
    country("BM", "Bermuda", "", ""),
    country("BO", "Bolivia, Plurinational State of", "Plurinational State of Bolivia", "Bolivia"),
    country("BR", "Brazil", "Federative Republic of Brazil", ""),
    country("BB", "Barbados", "", ""),
    country("BN", "Brunei Darussalam", "", "Brunei"),
    country("BT", "Bhutan", "Kingdom of Bhutan", ""),
    country("BV", "Bouvet Island", "", ""),
    country("BW", "Botswana", "Republic of Botswana", ""),
    country("CF", "Central African Republic", "", ""),
    country("CA", "Canada", "", ""),
    country("CC", "Cocos (Keeling) Islands", "", ""),
    country("CH", "Switzerland", "Swiss Confederation", ""),
    country("CL", "Chile", "Republic of Chile", ""),
    country("CN", "China", "People's Republic of China", ""),
    country("CI", "Côte d'Ivoire", "Republic of Côte d'Ivoire", ""),
    country("CM", "Cameroon", "Republic of Cameroon", ""),
    country("CD", "Congo, The Democratic Republic of the", "", ""),
    country("CG", "Congo", "Republic of the Congo", ""),
    country("CK", "Cook Islands", "", ""),
    country("CO", "Colombia", "Republic of Colombia", ""),
    country("KM", "Comoros", "Union of the Comoros", ""),
    country("CV", "Cabo Verde", "Republic of Cabo Verde", "Cape Verde"),
    country("CR", "Costa Rica", "Republic of Costa Rica", ""),
    country("CU", "Cuba", "Republic of Cuba", ""),
    country("CW", "Curaçao", "Curaçao", ""),
    country("CX", "Christmas Island", "", ""),
    country("KY", "Cayman Islands", "", ""),
    country("CY", "Cyprus", "Republic of Cyprus", ""),
    country("CZ", "Czechia", "Czech Republic", ""),
    country("DE", "Germany", "Federal Republic of Germany", ""),
    country("DJ", "Djibouti", "Republic of Djibouti", ""),
    country("DM", "Dominica", "Commonwealth of Dominica", ""),
    country("DK", "Denmark", "Kingdom of Denmark", ""),
    country("DO", "Dominican Republic", "", ""),
    country("DZ", "Algeria", "People's Democratic Republic of Algeria", ""),
    country("EC", "Ecuador", "Republic of Ecuador", ""),
    country("EG", "Egypt", "Arab Republic of Egypt", ""),
    country("ER", "Eritrea", "the State of Eritrea", ""),
    country("EH", "Western Sahara", "", ""),
    country("ES", "Spain", "Kingdom of Spain", ""),
    country("EE", "Estonia", "Republic of Estonia", ""),
    country("ET", "Ethiopia", "Federal Democratic Republic of Ethiopia", ""),
    country("FI", "Finland", "Republic of Finland", ""),
    country("FJ", "Fiji", "Republic of Fiji", ""),
    country("FK", "Falkland Islands (Malvinas)", "", ""),
    country("FR", "France", "French Republic", ""),
    country("FO", "Faroe Islands", "", ""),
    country("FM", "Micronesia, Federated States of", "Federated States of Micronesia", ""),
    country("GA", "Gabon", "Gabonese Republic", ""),
    country("GB", "United Kingdom", "United Kingdom of Great Britain and Northern Ireland", ""),
    country("GE", "Georgia", "", ""),
    country("GG", "Guernsey", "", ""),
    country("GH", "Ghana", "Republic of Ghana", ""),
    country("GI", "Gibraltar", "", ""),
    country("GN", "Guinea", "Republic of Guinea", ""),
    country("GP", "Guadeloupe", "", ""),
    country("GM", "Gambia", "Republic of the Gambia", ""),
    country("GW", "Guinea-Bissau", "Republic of Guinea-Bissau", ""),
    country("GQ", "Equatorial Guinea", "Republic of Equatorial Guinea", ""),
    country("GR", "Greece", "Hellenic Republic", ""),
    country("GD", "Grenada", "", ""),
    country("GL", "Greenland", "", ""),
    country("GT", "Guatemala", "Republic of Guatemala", ""),
    country("GF", "French Guiana", "", ""),
    country("GU", "Guam", "", ""),
    country("GY", "Guyana", "Republic of Guyana", ""),
    country("HK", "Hong Kong", "Hong Kong Special Administrative Region of China", ""),
    country("HM", "Heard Island and McDonald Islands", "", ""),
    country("HN", "Honduras", "Republic of Honduras", ""),
    country("HR", "Croatia", "Republic of Croatia", ""),
    country("HT", "Haiti", "Republic of Haiti", ""),
    country("HU", "Hungary", "", ""),
    country("ID", "Indonesia", "Republic of Indonesia", ""),
    country("IM", "Isle of Man", "", ""),
    country("IN", "India", "Republic of India", ""),
    country("IO", "British Indian Ocean Territory", "", ""),
    country("IE", "Ireland", "", ""),
    country("IR", "Iran, Islamic Republic of", "Islamic Republic of Iran", "Iran"),
    country("IQ", "Iraq", "Republic of Iraq", ""),
    country("IS", "Iceland", "Republic of Iceland", ""),
    country("IL", "Israel", "State of Israel", ""),
    country("IT", "Italy", "Italian Republic", ""),
    country("JM", "Jamaica", "", ""),
    country("JE", "Jersey", "", ""),
    country("JO", "Jordan", "Hashemite Kingdom of Jordan", ""),
    country("JP", "Japan", "", ""),
    country("KZ", "Kazakhstan", "Republic of Kazakhstan", ""),
    country("KE", "Kenya", "Republic of Kenya", ""),
    country("KG", "Kyrgyzstan", "Kyrgyz Republic", ""),
    country("KH", "Cambodia", "Kingdom of Cambodia", ""),
    country("KI", "Kiribati", "Republic of Kiribati", ""),
    country("KN", "Saint Kitts and Nevis", "", ""),
    country("KR", "Korea, Republic of", "Republic of Korea", "South Korea"),
    country("KW", "Kuwait", "State of Kuwait", ""),
    country("LA", "Lao People's Democratic Republic", "", "Laos"),
    country("LB", "Lebanon", "Lebanese Republic", ""),
    country("LR", "Liberia", "Republic of Liberia", ""),
    country("LY", "Libya", "Libya", ""),
    country("LC", "Saint Lucia", "", ""),
    country("LI", "Liechtenstein", "Principality of Liechtenstein", ""),
    country("LK", "Sri Lanka", "Democratic Socialist Republic of Sri Lanka", ""),
    country("LS", "Lesotho", "Kingdom of Lesotho", ""),
    country("LT", "Lithuania", "Republic of Lithuania", ""),
    country("LU", "Luxembourg", "Grand Duchy of Luxembourg", ""),
    country("LV", "Latvia", "Republic of Latvia", ""),
    country("MO", "Macao", "Macao Special Administrative Region of China", ""),
    country("MF", "Saint Martin (French part)", "", ""),
    country("MA", "Morocco", "Kingdom of Morocco", ""),
    country("MC", "Monaco", "Principality of Monaco", ""),
    country("MD", "Moldova, Republic of", "Republic of Moldova", "Moldova"),
    country("MG", "Madagascar", "Republic of Madagascar", ""),
    country("MV", "Maldives", "Republic of Maldives", ""),
    country("MX", "Mexico", "United Mexican States", ""),
    country("MH", "Marshall Islands", "Republic of the Marshall Islands", ""),
    country("MK", "North Macedonia", "Republic of North Macedonia", ""),
    country("ML", "Mali", "Republic of Mali", ""),
    country("MT", "Malta", "Republic of Malta", ""),
    country("MM", "Myanmar", "Republic of Myanmar", ""),
    country("ME", "Montenegro", "", ""),
    country("MN", "Mongolia", "", ""),
    country("MP", "Northern Mariana Islands", "Commonwealth of the Northern Mariana Islands", ""),
    country("MZ", "Mozambique", "Republic of Mozambique", ""),
    country("MR", "Mauritania", "Islamic Republic of Mauritania", ""),
    country("MS", "Montserrat", "", ""),
    country("MQ", "Martinique", "", ""),
    country("MU", "Mauritius", "Republic of Mauritius", ""),
    country("MW", "Malawi", "Republic of Malawi", ""),
    country("MY", "Malaysia", "", ""),
    country("YT", "Mayotte", "", ""),
    country("NA", "Namibia", "Republic of Namibia", ""),
    country("NC", "New Caledonia", "", ""),
    country("NE", "Niger", "Republic of the Niger", ""),
    country("NF", "Norfolk Island", "", ""),
    country("NG", "Nigeria", "Federal Republic of Nigeria", ""),
    country("NI", "Nicaragua", "Republic of Nicaragua", ""),
    country("NU", "Niue", "Niue", ""),
    country("NL", "Netherlands", "Kingdom of the Netherlands", ""),
    country("NO", "Norway", "Kingdom of Norway", ""),
    country("NP", "Nepal", "Federal Democratic Republic of Nepal", ""),
    country("NR", "Nauru", "Republic of Nauru", ""),
    country("NZ", "New Zealand", "", ""),
    country("OM", "Oman", "Sultanate of Oman", ""),
    country("PK", "Pakistan", "Islamic Republic of Pakistan", ""),
    country("PA", "Panama", "Republic of Panama", ""),
    country("PN", "Pitcairn", "", ""),
    country("PE", "Peru", "Republic of Peru", ""),
    country("PH", "Philippines", "Republic of the Philippines", ""),
    country("PW", "Palau", "Republic of Palau", ""),
    country("PG", "Papua New Guinea", "Independent State of Papua New Guinea", ""),
    country("PL", "Poland", "Republic of Poland", ""),
    country("PR", "Puerto Rico", "", ""),
    country("KP", "Korea, Democratic People's Republic of", "Democratic People's Republic of Korea", "North Korea"),
    country("PT", "Portugal", "Portuguese Republic", ""),
    country("PY", "Paraguay", "Republic of Paraguay", ""),
    country("PS", "Palestine, State of", "the State of Palestine", ""),
    country("PF", "French Polynesia", "", ""),
    country("QA", "Qatar", "State of Qatar", ""),
    country("RE", "Réunion", "", ""),
    country("RO", "Romania", "", ""),
    country("RU", "Russian Federation", "", "Russia"),
    country("RW", "Rwanda", "Rwandese Republic", ""),
    country("SA", "Saudi Arabia", "Kingdom of Saudi Arabia", ""),
    country("SD", "Sudan", "Republic of the Sudan", ""),
    country("SN", "Senegal", "Republic of Senegal", ""),
    country("SG", "Singapore", "Republic of Singapore", ""),
    country("GS", "South Georgia and the South Sandwich Islands", "", ""),
    country("SH", "Saint Helena, Ascension and Tristan da Cunha", "", ""),
    country("SJ", "Svalbard and Jan Mayen", "", ""),
    country("SB", "Solomon Islands", "", ""),
    country("SL", "Sierra Leone", "Republic of Sierra Leone", ""),
    country("SV", "El Salvador", "Republic of El Salvador", ""),
    country("SM", "San Marino", "Republic of San Marino", ""),
    country("SO", "Somalia", "Federal Republic of Somalia", ""),
    country("PM", "Saint Pierre and Miquelon", "", ""),
    country("RS", "Serbia", "Republic of Serbia", ""),
    country("SS", "South Sudan", "Republic of South Sudan", ""),
    country("ST", "Sao Tome and Principe", "Democratic Republic of Sao Tome and Principe", ""),
    country("SR", "Suriname", "Republic of Suriname", ""),
    country("SK", "Slovakia", "Slovak Republic", ""),
    country("SI", "Slovenia", "Republic of Slovenia", ""),
    country("SE", "Sweden", "Kingdom of Sweden", ""),
    country("SZ", "Eswatini", "Kingdom of Eswatini", ""),
    country("SX", "Sint Maarten (Dutch part)", "Sint Maarten (Dutch part)", ""),
    country("SC", "Seychelles", "Republic of Seychelles", ""),
    country("SY", "Syrian Arab Republic", "", "Syria"),
    country("TC", "Turks and Caicos Islands", "", ""),
    country("TD", "Chad", "Republic of Chad", ""),
    country("TG", "Togo", "Togolese Republic", ""),
    country("TH", "Thailand", "Kingdom of Thailand", ""),
    country("TJ", "Tajikistan", "Republic of Tajikistan", ""),
    country("TK", "Tokelau", "", ""),
    country("TM", "Turkmenistan", "", ""),
    country("TL", "Timor-Leste", "Democratic Republic of Timor-Leste", ""),
    country("TO", "Tonga", "Kingdom of Tonga", ""),
    country("TT", "Trinidad and Tobago", "Republic of Trinidad and Tobago", ""),
    country("TN", "Tunisia", "Republic of Tunisia", ""),
    country("TR", "Türkiye", "Republic of Türkiye", "Turkey"),
    country("TV", "Tuvalu", "", ""),
    country("TW", "Taiwan, Province of China", "Taiwan, Province of China", "Taiwan"),
    country("TZ", "Tanzania, United Republic of", "United Republic of Tanzania", "Tanzania"),
    country("UG", "Uganda", "Republic of Uganda", ""),
    country("UA", "Ukraine", "", ""),
    country("UM", "United States Minor Outlying Islands", "", ""),
    country("UY", "Uruguay", "Eastern Republic of Uruguay", ""),
    country("US", "United States", "United States of America", ""),
    country("UZ", "Uzbekistan", "Republic of Uzbekistan", ""),
    country("VA", "Holy See (Vatican City State)", "", ""),
    country("VC", "Saint Vincent and the Grenadines", "", ""),
    country("VE", "Venezuela, Bolivarian Republic of", "Bolivarian Republic of Venezuela", "Venezuela"),
    country("VG", "Virgin Islands, British", "British Virgin Islands", ""),
    country("VI", "Virgin Islands, U.S.", "Virgin Islands of the United States", ""),
    country("VN", "Viet Nam", "Socialist Republic of Viet Nam", "Vietnam"),
    country("VU", "Vanuatu", "Republic of Vanuatu", ""),
    country("WF", "Wallis and Futuna", "", ""),
    country("WS", "Samoa", "Independent State of Samoa", ""),
    country("YE", "Yemen", "Republic of Yemen", ""),
    country("ZA", "South Africa", "Republic of South Africa", ""),
    country("ZM", "Zambia", "Republic of Zambia", ""),
    country("ZW", "Zimbabwe", "Republic of Zimbabwe", ""),
];

/// Overrides for colloquial and historical names used by the daily reports.
/// Consulted before any catalog lookup.
pub const COUNTRY_ALIASES: &[(&str, &str)] = &[
    ("us", "us"),
    ("mainland china", "cn"),
    ("south korea", "kr"),
    ("korea, south", "kr"),
    ("macau", "mo"),
    ("uk", "gb"),
    ("burma", "mm"),
    ("congo (kinshasa)", "cd"),
    ("congo (brazzaville)", "cg"),
    ("west bank and gaza", "ps"),
    ("kosovo", "xk"),
    ("holy see", "va"),
    ("taiwan", "tw"),
];

/// US state and territory abbreviations used in `"County, ST"` locations.
pub const US_STATES: &[(&str, &str)] = &[
    ("AK", "Alaska"),
    ("AL", "Alabama"),
    ("AR", "Arkansas"),
    ("AS", "American Samoa"),
    ("AZ", "Arizona"),
    ("CA", "California"),
    ("CO", "Colorado"),
    ("CT", "Connecticut"),
    ("DC", "District of Columbia"),
    ("DE", "Delaware"),
    ("FL", "Florida"),
    ("GA", "Georgia"),
    ("GU", "Guam"),
    ("HI", "Hawaii"),
    ("IA", "Iowa"),
    ("ID", "Idaho"),
    ("IL", "Illinois"),
    ("IN", "Indiana"),
    ("KS", "Kansas"),
    ("KY", "Kentucky"),
    ("LA", "Louisiana"),
    ("MA", "Massachusetts"),
    ("MD", "Maryland"),
    ("ME", "Maine"),
    ("MI", "Michigan"),
    ("MN", "Minnesota"),
    ("MO", "Missouri"),
    ("MP", "Northern Mariana Islands"),
    ("MS", "Mississippi"),
    ("MT", "Montana"),
    ("NA", "National"),
    ("NC", "North Carolina"),
    ("ND", "North Dakota"),
    ("NE", "Nebraska"),
    ("NH", "New Hampshire"),
    ("NJ", "New Jersey"),
    ("NM", "New Mexico"),
    ("NV", "Nevada"),
    ("NY", "New York"),
    ("OH", "Ohio"),
    ("OK", "Oklahoma"),
    ("OR", "Oregon"),
    ("PA", "Pennsylvania"),
    ("PR", "Puerto Rico"),
    ("RI", "Rhode Island"),
    ("SC", "South Carolina"),
    ("SD", "South Dakota"),
    ("TN", "Tennessee"),
    ("TX", "Texas"),
    ("UT", "Utah"),
    ("VA", "Virginia"),
    ("VI", "Virgin Islands"),
    ("VT", "Vermont"),
    ("WA", "Washington"),
    ("WI", "Wisconsin"),
    ("WV", "West Virginia"),
    ("WY", "Wyoming"),
];

lazy_static! {
    static ref ALIAS_INDEX: HashMap<&'static str, &'static str> =
        COUNTRY_ALIASES.iter().copied().collect();

    /// Lowercased short name -> lowercase alpha-2.
    static ref CATALOG_INDEX: HashMap<String, String> = COUNTRIES
        .iter()
        .map(|c| (c.name.to_lowercase(), c.alpha_2.to_lowercase()))
        .collect();

    static ref STATE_INDEX: HashMap<&'static str, &'static str> =
        US_STATES.iter().copied().collect();
}

/// Alias override for an already lowercased, trimmed name.
pub fn alias_code(name: &str) -> Option<&'static str> {
    ALIAS_INDEX.get(name).copied()
}

/// Exact catalog match on the short country name (lowercased input).
pub fn catalog_code(name: &str) -> Option<&'static str> {
    CATALOG_INDEX.get(name).map(|s| s.as_str())
}

/// Full state name for an upper-cased two-letter abbreviation.
pub fn state_name(abbreviation: &str) -> Option<&'static str> {
    STATE_INDEX.get(abbreviation).copied()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_state_table_covers_states_and_territories() {
        // 50 states, DC, five territories, and the "NA" national bucket
        assert_eq!(US_STATES.len(), 57);
        let unique: HashSet<_> = US_STATES.iter().map(|(abbr, _)| abbr).collect();
        assert_eq!(unique.len(), US_STATES.len());
    }

    #[test]
    fn test_country_codes_are_unique() {
        let unique: HashSet<_> = COUNTRIES.iter().map(|c| c.alpha_2).collect();
        assert_eq!(unique.len(), COUNTRIES.len());
        assert!(COUNTRIES.iter().all(|c| c.alpha_2.len() == 2));
    }

    #[test]
    fn test_lookups() {
        assert_eq!(alias_code("mainland china"), Some("cn"));
        assert_eq!(catalog_code("france"), Some("fr"));
        assert_eq!(catalog_code("united states"), Some("us"));
        assert_eq!(state_name("CA"), Some("California"));
        assert_eq!(state_name("ca"), None);
    }
}
