use chrono::{DateTime, Utc};
use query_builder::{PaginationMeta, QuerySchema};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

/// Query allow-lists for product list endpoints.
///
/// The searchable list drives both the data and the count query, so a
/// field added here is picked up by both paths.
pub const PRODUCT_QUERY_SCHEMA: QuerySchema = QuerySchema::new(
    &["title", "brand", "description", "type"],
    &["title", "price", "brand", "created_at", "updated_at"],
    &[
        "title",
        "image",
        "description",
        "price",
        "affiliate_link",
        "category",
        "brand",
        "season",
        "ageGroup",
        "type",
        "created_at",
        "updated_at",
    ],
    &[
        "title", "price", "brand", "category", "season", "ageGroup", "type",
    ],
);

/// Query allow-lists for category list endpoints.
pub const CATEGORY_QUERY_SCHEMA: QuerySchema = QuerySchema::new(
    &["name", "description"],
    &["name", "created_at", "updated_at"],
    &["name", "description", "created_at", "updated_at"],
    &["name"],
);

/// Category entity
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Category {
    /// Unique identifier (stored as _id in MongoDB)
    #[serde(rename = "_id", alias = "id")]
    pub id: Uuid,
    /// Category name (unique)
    pub name: String,
    /// Optional description
    pub description: Option<String>,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

/// Product entity
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Product {
    /// Unique identifier (stored as _id in MongoDB)
    #[serde(rename = "_id", alias = "id")]
    pub id: Uuid,
    /// Product title (unique)
    pub title: String,
    /// Image URL
    pub image: String,
    /// Optional description
    pub description: Option<String>,
    /// Display price, kept as text to preserve currency formatting
    pub price: String,
    /// Outbound affiliate link
    pub affiliate_link: String,
    /// Owning category ID
    pub category: Uuid,
    /// Optional brand name
    pub brand: Option<String>,
    /// Seasons the product applies to
    #[serde(default)]
    pub season: Vec<String>,
    /// Age groups the product applies to
    #[serde(rename = "ageGroup", default)]
    pub age_group: Vec<String>,
    /// Product type label ("type" on the wire)
    #[serde(rename = "type")]
    pub kind: Option<String>,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

/// DTO for creating a new product
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateProduct {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[validate(url)]
    pub image: String,
    pub description: Option<String>,
    #[validate(length(min = 1, max = 50))]
    pub price: String,
    #[validate(url)]
    pub affiliate_link: String,
    pub category: Uuid,
    pub brand: Option<String>,
    #[serde(default)]
    pub season: Vec<String>,
    #[serde(rename = "ageGroup", default)]
    pub age_group: Vec<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

/// DTO for updating an existing product
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateProduct {
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,
    #[validate(url)]
    pub image: Option<String>,
    pub description: Option<String>,
    #[validate(length(min = 1, max = 50))]
    pub price: Option<String>,
    #[validate(url)]
    pub affiliate_link: Option<String>,
    pub category: Option<Uuid>,
    pub brand: Option<String>,
    pub season: Option<Vec<String>>,
    #[serde(rename = "ageGroup")]
    pub age_group: Option<Vec<String>>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

/// DTO for creating a new category
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateCategory {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    pub description: Option<String>,
}

/// DTO for updating an existing category
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateCategory {
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,
    pub description: Option<String>,
}

/// Product with its category document embedded, as returned by list
/// and get endpoints.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ProductWithCategory {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub title: String,
    pub image: String,
    pub description: Option<String>,
    pub price: String,
    pub affiliate_link: String,
    /// Resolved category, `None` when the referenced document is gone
    pub category: Option<Category>,
    pub brand: Option<String>,
    pub season: Vec<String>,
    #[serde(rename = "ageGroup")]
    pub age_group: Vec<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ProductWithCategory {
    pub fn new(product: Product, category: Option<Category>) -> Self {
        Self {
            id: product.id,
            title: product.title,
            image: product.image,
            description: product.description,
            price: product.price,
            affiliate_link: product.affiliate_link,
            category,
            brand: product.brand,
            season: product.season,
            age_group: product.age_group,
            kind: product.kind,
            created_at: product.created_at,
            updated_at: product.updated_at,
        }
    }
}

/// Paginated list envelope
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ListResponse<T> {
    pub data: Vec<T>,
    pub meta: PaginationMeta,
}

impl Category {
    /// Create a new category from CreateCategory DTO
    pub fn new(input: CreateCategory) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7(),
            name: input.name,
            description: input.description,
            created_at: now,
            updated_at: now,
        }
    }

    /// Apply updates from UpdateCategory DTO
    pub fn apply_update(&mut self, update: UpdateCategory) {
        if let Some(name) = update.name {
            self.name = name;
        }
        if let Some(description) = update.description {
            self.description = Some(description);
        }
        self.updated_at = Utc::now();
    }
}

impl Product {
    /// Create a new product from CreateProduct DTO
    pub fn new(input: CreateProduct) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7(),
            title: input.title,
            image: input.image,
            description: input.description,
            price: input.price,
            affiliate_link: input.affiliate_link,
            category: input.category,
            brand: input.brand,
            season: input.season,
            age_group: input.age_group,
            kind: input.kind,
            created_at: now,
            updated_at: now,
        }
    }

    /// Apply updates from UpdateProduct DTO
    pub fn apply_update(&mut self, update: UpdateProduct) {
        if let Some(title) = update.title {
            self.title = title;
        }
        if let Some(image) = update.image {
            self.image = image;
        }
        if let Some(description) = update.description {
            self.description = Some(description);
        }
        if let Some(price) = update.price {
            self.price = price;
        }
        if let Some(affiliate_link) = update.affiliate_link {
            self.affiliate_link = affiliate_link;
        }
        if let Some(category) = update.category {
            self.category = category;
        }
        if let Some(brand) = update.brand {
            self.brand = Some(brand);
        }
        if let Some(season) = update.season {
            self.season = season;
        }
        if let Some(age_group) = update.age_group {
            self.age_group = age_group;
        }
        if let Some(kind) = update.kind {
            self.kind = Some(kind);
        }
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_input() -> CreateProduct {
        CreateProduct {
            title: "Wool socks".to_string(),
            image: "https://example.com/socks.jpg".to_string(),
            description: None,
            price: "12.99".to_string(),
            affiliate_link: "https://example.com/buy".to_string(),
            category: Uuid::now_v7(),
            brand: Some("Acme".to_string()),
            season: vec!["winter".to_string()],
            age_group: vec!["adult".to_string()],
            kind: Some("socks".to_string()),
        }
    }

    #[test]
    fn test_product_new_sets_timestamps() {
        let product = Product::new(create_input());
        assert_eq!(product.created_at, product.updated_at);
        assert_eq!(product.title, "Wool socks");
    }

    #[test]
    fn test_product_apply_update_partial() {
        let mut product = Product::new(create_input());
        let original_image = product.image.clone();

        product.apply_update(UpdateProduct {
            title: Some("Cotton socks".to_string()),
            ..Default::default()
        });

        assert_eq!(product.title, "Cotton socks");
        assert_eq!(product.image, original_image);
        assert!(product.updated_at >= product.created_at);
    }

    #[test]
    fn test_product_serializes_wire_names() {
        let product = Product::new(create_input());
        let json = serde_json::to_value(&product).unwrap();
        assert!(json.get("_id").is_some());
        assert!(json.get("ageGroup").is_some());
        assert!(json.get("type").is_some());
        assert!(json.get("age_group").is_none());
        assert!(json.get("kind").is_none());
    }

    #[test]
    fn test_create_product_validation() {
        use validator::Validate;

        let mut input = create_input();
        input.image = "not-a-url".to_string();
        assert!(input.validate().is_err());
    }

    #[test]
    fn test_category_apply_update() {
        let mut category = Category::new(CreateCategory {
            name: "Shoes".to_string(),
            description: None,
        });

        category.apply_update(UpdateCategory {
            description: Some("Footwear".to_string()),
            ..Default::default()
        });

        assert_eq!(category.name, "Shoes");
        assert_eq!(category.description.as_deref(), Some("Footwear"));
    }
}
