use crate::models::{Category, Tag, User};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

// DTOs define the exact shape of data exchanged with clients, separate from
// the database models so each endpoint exposes only what it should.

// ============================================================================
// Authentication DTOs
// ============================================================================

/// Registration request from client
#[derive(Validate, Debug, Default, Clone, Serialize, Deserialize)]
pub struct RegisterUserDto {
    #[validate(length(min = 2, message = "Full name must be at least 2 characters"))]
    pub full_name: String,

    #[validate(
        length(min = 1, message = "Email is required"),
        email(message = "Invalid email format")
    )]
    pub email: String,

    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,

    #[validate(
        length(min = 1, message = "Confirm password is required"),
        must_match(other = "password", message = "Passwords do not match")
    )]
    pub confirm_password: String,
}

#[derive(Validate, Debug, Default, Clone, Serialize, Deserialize)]
pub struct LoginUserDto {
    #[validate(
        length(min = 1, message = "Email is required"),
        email(message = "Invalid email format")
    )]
    pub email: String,

    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

#[derive(Deserialize, Serialize, Validate, Debug, Clone)]
pub struct ForgotPasswordRequestDto {
    #[validate(
        length(min = 1, message = "Email is required"),
        email(message = "Invalid email format")
    )]
    pub email: String,
}

#[derive(Debug, Serialize, Deserialize, Validate, Clone)]
pub struct ResetPasswordRequestDto {
    #[validate(length(min = 1, message = "Token is required"))]
    pub token: String,

    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub new_password: String,

    #[validate(
        length(min = 1, message = "Confirm password is required"),
        must_match(other = "new_password", message = "Passwords do not match")
    )]
    pub confirm_password: String,
}

// ============================================================================
// User response DTOs (filtered data for clients)
// ============================================================================

/// Client-safe view of a user (excludes the password hash and reset token).
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct FilterUserDto {
    pub id: i64,
    pub full_name: String,
    pub email: String,
    pub role: String,
    pub avatar_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl FilterUserDto {
    pub fn filter_user(user: &User) -> Self {
        FilterUserDto {
            id: user.id,
            full_name: user.full_name.to_owned(),
            email: user.email.to_owned(),
            role: user.role.to_str().to_string(),
            avatar_url: user.avatar_url.to_owned(),
            created_at: user.created_at,
        }
    }

    pub fn filter_users(users: &[User]) -> Vec<FilterUserDto> {
        users.iter().map(FilterUserDto::filter_user).collect()
    }
}

/// Login/registration success response with JWT token
#[derive(Debug, Serialize, Deserialize)]
pub struct AuthResponseDto {
    pub message: String,
    pub access_token: String,
    pub user: FilterUserDto,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UserListResponseDto {
    pub users: Vec<FilterUserDto>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UserResponseDto {
    pub message: String,
    pub user: FilterUserDto,
}

/// Generic success response
#[derive(Serialize, Deserialize)]
pub struct Response {
    pub message: String,
}

// ============================================================================
// User update DTOs
// ============================================================================

/// Partial profile update; omitted fields are left unchanged.
#[derive(Validate, Debug, Default, Clone, Serialize, Deserialize)]
pub struct ProfileUpdateDto {
    pub full_name: Option<String>,

    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,

    pub avatar_url: Option<String>,
}

/// Password change request (requires the current password)
#[derive(Debug, Validate, Default, Clone, Serialize, Deserialize)]
pub struct PasswordChangeDto {
    #[validate(length(min = 1, message = "Current password is required"))]
    pub old_password: String,

    #[validate(length(min = 8, message = "New password must be at least 8 characters"))]
    pub new_password: String,

    #[validate(
        length(min = 1, message = "Confirm password is required"),
        must_match(other = "new_password", message = "New passwords do not match")
    )]
    pub confirm_new_password: String,
}

// ============================================================================
// Article DTOs
// ============================================================================

/// Query parameters for the article listing endpoint.
///
/// `page` and `limit` must be positive when given; out-of-range values are a
/// caller error, never silently clamped. Date bounds are inclusive.
#[derive(Debug, Deserialize, Validate)]
pub struct ArticlesQueryParams {
    pub search: Option<String>,

    pub category_id: Option<i64>,

    pub date_from: Option<String>,

    pub date_to: Option<String>,

    #[validate(range(min = 1, message = "Page must be greater than 0"))]
    pub page: Option<i64>,

    #[validate(range(min = 1, message = "Limit must be greater than 0"))]
    pub limit: Option<i64>,
}

/// Article creation request. Field rules follow the editorial minimums:
/// trimmed title >= 5 chars, trimmed content >= 50 chars, trimmed author
/// name >= 2 chars. Failures are reported as an itemized list.
#[derive(Debug, Serialize, Deserialize, Default, Clone)]
pub struct CreateArticleDto {
    pub title: String,
    pub content: String,
    pub category_id: Option<i64>,
    pub author_name: String,
    pub source_url: Option<String>,
    pub image_url: Option<String>,
    pub published_date: String,
    pub tag_ids: Option<Vec<i64>>,
}

impl CreateArticleDto {
    /// Collect every validation failure instead of stopping at the first,
    /// mirroring how the admin form surfaces problems to the editor.
    pub fn validation_errors(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.title.trim().len() < 5 {
            errors.push("Title must be at least 5 characters".to_string());
        }
        if self.content.trim().len() < 50 {
            errors.push("Content must be at least 50 characters".to_string());
        }
        if self.category_id.is_none() {
            errors.push("Category is required".to_string());
        }
        if self.author_name.trim().len() < 2 {
            errors.push("Author name is required".to_string());
        }

        errors
    }
}

/// Partial article update; rules apply only to fields that are present.
/// `tag_ids`, when given, replaces the entire tag set.
#[derive(Debug, Serialize, Deserialize, Default, Clone)]
pub struct UpdateArticleDto {
    pub title: Option<String>,
    pub content: Option<String>,
    pub category_id: Option<i64>,
    pub author_name: Option<String>,
    pub source_url: Option<String>,
    pub image_url: Option<String>,
    pub published_date: Option<String>,
    pub tag_ids: Option<Vec<i64>>,
}

impl UpdateArticleDto {
    pub fn validation_errors(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if let Some(title) = &self.title {
            if title.trim().len() < 5 {
                errors.push("Title must be at least 5 characters".to_string());
            }
        }
        if let Some(content) = &self.content {
            if content.trim().len() < 50 {
                errors.push("Content must be at least 50 characters".to_string());
            }
        }
        if let Some(author_name) = &self.author_name {
            if author_name.trim().len() < 2 {
                errors.push("Author name is required".to_string());
            }
        }

        errors
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CategoryDto {
    pub id: i64,
    pub name: String,
    pub slug: String,
}

impl CategoryDto {
    pub fn from_model(category: &Category) -> Self {
        CategoryDto {
            id: category.id,
            name: category.name.to_owned(),
            slug: category.slug.to_owned(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TagDto {
    pub id: i64,
    pub name: String,
    pub slug: String,
}

impl TagDto {
    pub fn from_model(tag: &Tag) -> Self {
        TagDto {
            id: tag.id,
            name: tag.name.to_owned(),
            slug: tag.slug.to_owned(),
        }
    }

    pub fn from_models(tags: &[Tag]) -> Vec<TagDto> {
        tags.iter().map(TagDto::from_model).collect()
    }
}

/// Full article view, returned by the single-article and mutation endpoints.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ArticleDto {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub category: CategoryDto,
    pub image_url: Option<String>,
    pub author_name: String,
    pub source_url: Option<String>,
    pub published_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub tags: Vec<TagDto>,
    pub is_bookmarked: bool,
}

/// Listing view of an article: everything except the body text.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ArticleListItemDto {
    pub id: i64,
    pub title: String,
    pub category: CategoryDto,
    pub image_url: Option<String>,
    pub author_name: String,
    pub source_url: Option<String>,
    pub published_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub tags: Vec<TagDto>,
    pub is_bookmarked: bool,
}

/// Paginated listing response.
#[derive(Debug, Serialize, Deserialize)]
pub struct ArticleListResponseDto {
    pub items: Vec<ArticleListItemDto>,
    pub total: i64,
    pub page: i64,
    pub limit: i64,
    pub pages: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ArticleMutationResponseDto {
    pub message: String,
    pub article: ArticleDto,
}

// ============================================================================
// Category & tag DTOs
// ============================================================================

#[derive(Debug, Deserialize, Serialize, Validate, Clone)]
pub struct CreateTaxonomyDto {
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,

    #[validate(length(min = 1, message = "Slug is required"))]
    pub slug: String,
}

/// Partial update for a category or tag.
#[derive(Debug, Deserialize, Serialize, Default, Clone)]
pub struct UpdateTaxonomyDto {
    pub name: Option<String>,
    pub slug: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CategoryListResponseDto {
    pub categories: Vec<CategoryDto>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CategoryResponseDto {
    pub message: String,
    pub category: CategoryDto,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TagListResponseDto {
    pub tags: Vec<TagDto>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TagResponseDto {
    pub message: String,
    pub tag: TagDto,
}

// ============================================================================
// Bookmark DTOs
// ============================================================================

#[derive(Debug, Deserialize, Validate)]
pub struct AddBookmarkDto {
    #[validate(range(min = 1, message = "Article ID is required"))]
    pub article_id: i64,
}

/// A bookmark with its article in listing (body-less) form.
#[derive(Debug, Serialize, Deserialize)]
pub struct BookmarkDto {
    pub id: i64,
    pub article: ArticleListItemDto,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BookmarkListResponseDto {
    pub bookmarks: Vec<BookmarkDto>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BookmarkResponseDto {
    pub message: String,
    pub bookmark: BookmarkDto,
}

// ============================================================================
// Summarization DTOs
// ============================================================================

/// The six summary facets, in canonical presentation order.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SummaryFacet {
    Who,
    When,
    Where,
    What,
    Why,
    How,
}

impl SummaryFacet {
    pub const ALL: [SummaryFacet; 6] = [
        SummaryFacet::Who,
        SummaryFacet::When,
        SummaryFacet::Where,
        SummaryFacet::What,
        SummaryFacet::Why,
        SummaryFacet::How,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SummaryFacet::Who => "who",
            SummaryFacet::When => "when",
            SummaryFacet::Where => "where",
            SummaryFacet::What => "what",
            SummaryFacet::Why => "why",
            SummaryFacet::How => "how",
        }
    }
}

/// Target answer length for the summarization service.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SummaryLength {
    Short,
    #[default]
    Medium,
    Long,
}

/// Request body for `POST /api/summarize`. Exactly one of `article_id` or
/// `content` must be supplied. Absent `filters` means all six facets.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SummarizeRequestDto {
    pub article_id: Option<i64>,
    pub content: Option<String>,
    pub filters: Option<Vec<SummaryFacet>>,
    pub length: Option<SummaryLength>,
}

/// Facet map returned by the summarization endpoint and consumed by the
/// export service. Serializes only the facets that were requested, in
/// canonical order, so the response carries exactly the requested keys.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct SummaryDto {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub who: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub when: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub r#where: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub what: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub why: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub how: Option<String>,
}

impl SummaryDto {
    pub fn get(&self, facet: SummaryFacet) -> Option<&str> {
        let slot = match facet {
            SummaryFacet::Who => &self.who,
            SummaryFacet::When => &self.when,
            SummaryFacet::Where => &self.r#where,
            SummaryFacet::What => &self.what,
            SummaryFacet::Why => &self.why,
            SummaryFacet::How => &self.how,
        };
        slot.as_deref()
    }

    pub fn set(&mut self, facet: SummaryFacet, value: String) {
        let slot = match facet {
            SummaryFacet::Who => &mut self.who,
            SummaryFacet::When => &mut self.when,
            SummaryFacet::Where => &mut self.r#where,
            SummaryFacet::What => &mut self.what,
            SummaryFacet::Why => &mut self.why,
            SummaryFacet::How => &mut self.how,
        };
        *slot = Some(value);
    }

    /// Present, non-empty facets in canonical order.
    pub fn entries(&self) -> Vec<(SummaryFacet, &str)> {
        SummaryFacet::ALL
            .iter()
            .filter_map(|facet| match self.get(*facet) {
                Some(text) if !text.trim().is_empty() => Some((*facet, text)),
                _ => None,
            })
            .collect()
    }
}

// ============================================================================
// Export DTOs
// ============================================================================

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Pdf,
    Txt,
}

/// Query parameters for `GET /api/articles/{id}/export`.
///
/// `summary` is a JSON-encoded facet map produced by a prior summarize call;
/// it is only consulted when `include_summary` is true.
#[derive(Debug, Deserialize)]
pub struct ExportQueryParams {
    pub format: Option<ExportFormat>,
    pub include_summary: Option<bool>,
    pub summary: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_article_title_boundary() {
        let mut dto = CreateArticleDto {
            title: "1234".to_string(),
            content: "c".repeat(50),
            category_id: Some(1),
            author_name: "Redaksi".to_string(),
            published_date: "2024-05-01T00:00:00Z".to_string(),
            ..Default::default()
        };
        assert_eq!(
            dto.validation_errors(),
            vec!["Title must be at least 5 characters".to_string()]
        );

        dto.title = "12345".to_string();
        assert!(dto.validation_errors().is_empty());
    }

    #[test]
    fn create_article_trims_before_measuring() {
        let dto = CreateArticleDto {
            title: "  1234   ".to_string(),
            content: format!("  {}  ", "c".repeat(50)),
            category_id: None,
            author_name: " A ".to_string(),
            published_date: "2024-05-01T00:00:00Z".to_string(),
            ..Default::default()
        };
        let errors = dto.validation_errors();
        assert!(errors.contains(&"Title must be at least 5 characters".to_string()));
        assert!(errors.contains(&"Category is required".to_string()));
        assert!(errors.contains(&"Author name is required".to_string()));
        // 50 chars of content survive the trim
        assert!(!errors.contains(&"Content must be at least 50 characters".to_string()));
    }

    #[test]
    fn update_article_ignores_absent_fields() {
        let dto = UpdateArticleDto::default();
        assert!(dto.validation_errors().is_empty());

        let dto = UpdateArticleDto {
            title: Some("abc".to_string()),
            ..Default::default()
        };
        assert_eq!(
            dto.validation_errors(),
            vec!["Title must be at least 5 characters".to_string()]
        );
    }

    #[test]
    fn summary_entries_skip_empty_and_keep_canonical_order() {
        let mut summary = SummaryDto::default();
        summary.set(SummaryFacet::How, "Kronologi kejadian.".to_string());
        summary.set(SummaryFacet::Why, "   ".to_string());
        summary.set(SummaryFacet::Who, "Pejabat terkait.".to_string());

        let entries = summary.entries();
        let facets: Vec<SummaryFacet> = entries.iter().map(|(f, _)| *f).collect();
        assert_eq!(facets, vec![SummaryFacet::Who, SummaryFacet::How]);
    }

    #[test]
    fn summary_serializes_only_present_facets() {
        let mut summary = SummaryDto::default();
        summary.set(SummaryFacet::Who, "a".to_string());
        summary.set(SummaryFacet::What, "b".to_string());

        let json = serde_json::to_string(&summary).unwrap();
        assert_eq!(json, r#"{"who":"a","what":"b"}"#);
    }
}
