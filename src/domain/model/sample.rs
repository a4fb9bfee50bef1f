use crate::domain::model::NewSweet;
use rust_decimal::Decimal;

// (名前, カテゴリ, 価格, 在庫数)
const SAMPLE_SWEETS: &[(&str, &str, i64, i64)] = &[
    ("Kaju Katli", "Mithai", 450, 50),
    ("Gulab Jamun", "Mithai", 300, 75),
    ("Rasgulla", "Mithai", 280, 60),
    ("Barfi", "Mithai", 350, 40),
    ("Ladoo", "Mithai", 320, 55),
    ("Jalebi", "Mithai", 250, 30),
    ("Rasmalai", "Mithai", 380, 45),
    ("Peda", "Mithai", 400, 50),
    ("Soan Papdi", "Mithai", 220, 65),
    ("Besan Ladoo", "Mithai", 280, 50),
    ("Kheer", "Dessert", 150, 25),
    ("Gajar Halwa", "Dessert", 200, 20),
    ("Rabri", "Dessert", 180, 15),
    ("Shrikhand", "Dessert", 160, 30),
    ("Chocolate Barfi", "Mithai", 420, 35),
    ("Coconut Barfi", "Mithai", 300, 40),
    ("Motichoor Ladoo", "Mithai", 350, 45),
    ("Kalakand", "Mithai", 380, 30),
    ("Mysore Pak", "Mithai", 400, 25),
    ("Badam Halwa", "Dessert", 450, 20),
];

/// 初期データ投入用のサンプルカタログ
pub fn sample_catalog() -> Vec<NewSweet> {
    SAMPLE_SWEETS
        .iter()
        .map(|&(name, category, price, quantity)| NewSweet {
            name: name.to_string(),
            category: category.to_string(),
            price: Decimal::new(price * 100, 2),
            quantity,
            image_url: None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{Sweet, SweetId};

    #[test]
    fn test_sample_catalog_is_valid() {
        let catalog = sample_catalog();
        assert_eq!(catalog.len(), 20);
        for input in catalog {
            assert!(Sweet::create(SweetId::new(), input).is_ok());
        }
    }
}
