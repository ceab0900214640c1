//! Privacy redaction of assembled records

use crate::record::Record;

/// Length of an individual taxpayer number (CPF)
const CPF_LEN: usize = 11;

/// Mask a CPF-looking 11-digit tail in a name
///
/// When the last 11 characters are digits and the character before them (if
/// any) is not, the tail becomes `***` + digits 4 to 8 + `***`. Any other name
/// is returned unchanged.
pub fn mask_name(name: &str) -> String {
    let chars: Vec<char> = name.chars().collect();
    if chars.len() < CPF_LEN {
        return name.to_string();
    }

    let split = chars.len() - CPF_LEN;
    let (head, tail) = chars.split_at(split);
    if !tail.iter().all(char::is_ascii_digit) {
        return name.to_string();
    }
    if head.last().is_some_and(char::is_ascii_digit) {
        return name.to_string();
    }

    let head: String = head.iter().collect();
    let middle: String = tail[3..8].iter().collect();
    format!("{head}***{middle}***")
}

/// Strip personal data from a record
///
/// Email is always dropped and a CPF in the trade name is masked. Records whose
/// legal nature is an individual-type nature also lose street address and
/// phone numbers.
pub fn redact(record: &mut Record) {
    record.email = None;
    record.trade_name = mask_name(&record.trade_name).trim().to_string();

    let individual = record
        .legal_nature
        .as_deref()
        .is_some_and(|nature| nature.to_lowercase().contains("individual"));
    if individual {
        record.street_type.clear();
        record.street.clear();
        record.number.clear();
        record.complement.clear();
        record.phone_1.clear();
        record.phone_2.clear();
        record.fax.clear();
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_name() {
        let cases = [
            ("João Silva 12345678901", "João Silva ***45678***"),
            ("Maria Santos ME 98765432109", "Maria Santos ME ***65432***"),
            ("Empresa-12345678901", "Empresa-***45678***"),
            ("A12345678901", "A***45678***"),
            ("12345678901", "***45678***"),
            ("Café é Bom 12312312312", "Café é Bom ***12312***"),
            ("Empresa123456789012", "Empresa123456789012"),
            ("000012345678901", "000012345678901"),
            ("1234567890", "1234567890"),
            ("Short", "Short"),
            ("NomeEmpresa1234567890X", "NomeEmpresa1234567890X"),
            ("Test 123456-78901", "Test 123456-78901"),
            ("", ""),
        ];
        for (input, expected) in cases {
            assert_eq!(mask_name(input), expected, "input {input:?}");
        }
    }

    fn record(nature: Option<&str>) -> Record {
        Record {
            trade_name: "João Silva 12345678901".to_string(),
            email: Some("test@ser.pro".to_string()),
            legal_nature: nature.map(str::to_string),
            street_type: "RUA".to_string(),
            street: "DAS FLORES".to_string(),
            number: "10".to_string(),
            complement: "SALA 1".to_string(),
            phone_1: "6112345678".to_string(),
            phone_2: "87654321".to_string(),
            fax: "11".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_redact_keeps_address_for_non_individual() {
        let mut r = record(Some("Empresa Pública"));
        redact(&mut r);
        assert_eq!(r.email, None);
        assert_eq!(r.trade_name, "João Silva ***45678***");
        assert_eq!(r.street_type, "RUA");
        assert_eq!(r.phone_1, "6112345678");
        assert_eq!(r.phone_2, "87654321");
        assert_eq!(r.fax, "11");
    }

    #[test]
    fn test_redact_clears_address_for_individual() {
        let mut r = record(Some("Empresário (Individual)"));
        redact(&mut r);
        assert_eq!(r.email, None);
        assert!(r.street_type.is_empty());
        assert!(r.street.is_empty());
        assert!(r.number.is_empty());
        assert!(r.complement.is_empty());
        assert!(r.phone_1.is_empty());
        assert!(r.phone_2.is_empty());
        assert!(r.fax.is_empty());
    }

    #[test]
    fn test_redact_without_registrant_base() {
        let mut r = record(None);
        redact(&mut r);
        assert_eq!(r.street, "DAS FLORES");
    }
}
