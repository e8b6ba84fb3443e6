//! Shared text folding used for header matching and identity keys.

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Academic and professional titles dropped from the front of physician names.
const TITLES: &[&str] = &["dr", "op", "prof", "doc", "uzm", "yrd", "dt"];

/// Lower-case, strip diacritics and collapse whitespace.
///
/// Dotless `ı` folds to `i` so that Turkish upper-case forms (`YILMAZ`,
/// `KARDİYOLOJİ`) and their lower-case spellings share a key.
pub fn fold(value: &str) -> String {
    let lowered: String = value
        .chars()
        .flat_map(char::to_lowercase)
        .map(|c| if c == 'ı' { 'i' } else { c })
        .collect();
    
    let stripped: String = lowered
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .collect();
    
    collapse_whitespace(&stripped)
}

pub fn collapse_whitespace(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Matching key for a physician display name.
pub fn physician_key(name: &str) -> String {
    let folded = fold(&name.replace('.', " "));
    let tokens: Vec<&str> = folded
        .split_whitespace()
        .skip_while(|token| TITLES.contains(token))
        .collect();
    
    // A name made only of titles keeps its folded form
    if tokens.is_empty() {
        folded
    } else {
        tokens.join(" ")
    }
}

pub fn branch_key(branch: &str) -> String {
    fold(branch)
}

/// Composite key used for the version physician map and diff matching.
pub fn identity_key(name: &str, branch: &str) -> String {
    format!("{}|{}", physician_key(name), branch_key(branch))
}

#[cfg(test)]
mod tests {
    use super::*;
    
    #[test]
    fn test_fold_turkish_letters() {
        assert_eq!(fold("KARDİYOLOJİ"), "kardiyoloji");
        assert_eq!(fold("Kardiyoloji"), "kardiyoloji");
        assert_eq!(fold("  Ayşe   Yılmaz "), "ayse yilmaz");
        assert_eq!(fold("Göğüs Cerrahisi"), "gogus cerrahisi");
    }
    
    #[test]
    fn test_physician_key_drops_titles() {
        assert_eq!(physician_key("Dr. Ayşe Yılmaz"), "ayse yilmaz");
        assert_eq!(physician_key("AYŞE YILMAZ"), "ayse yilmaz");
        assert_eq!(physician_key("Op.Dr. Mehmet Öz"), "mehmet oz");
        assert_eq!(physician_key("Prof. Dr. Ali Can"), "ali can");
        assert_eq!(physician_key("Doç. Dr. Zeynep Kaya"), "zeynep kaya");
    }
    
    #[test]
    fn test_title_inside_name_is_kept() {
        assert_eq!(physician_key("Ali Dr Veli"), "ali dr veli");
    }
    
    #[test]
    fn test_identity_key() {
        assert_eq!(
            identity_key("Dr. Ayşe Yılmaz", "Kardiyoloji"),
            identity_key("AYŞE YILMAZ", "KARDİYOLOJİ")
        );
    }
}
