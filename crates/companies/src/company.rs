use serde::{Deserialize, Serialize};

use metasoft_core::{AggregateId, Entity, FieldErrors, PaperSize, Template, ValueObject};

/// Company identifier (owner-scoped via `UserId` keys at the store).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CompanyId(pub AggregateId);

impl CompanyId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for CompanyId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Postal address printed on letterheads and invoices.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub street: String,
    pub city: String,
    pub postal_code: String,
    pub country: String,
}

impl ValueObject for Address {}

/// Branding color, canonical `#rrggbb` lowercase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HexColor(String);

impl HexColor {
    /// Parse and canonicalize a `#rrggbb` color string.
    pub fn parse(s: &str) -> Result<Self, String> {
        let trimmed = s.trim();
        let hex = trimmed
            .strip_prefix('#')
            .ok_or_else(|| format!("'{trimmed}' must start with '#'"))?;
        if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(format!("'{trimmed}' must be a #rrggbb hex color"));
        }
        Ok(Self(format!("#{}", hex.to_ascii_lowercase())))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl ValueObject for HexColor {}

impl core::fmt::Display for HexColor {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Entity: a company profile owned by a user.
///
/// `is_default` is flipped only by the store's transactional default swap;
/// the entity itself never toggles another company's flag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Company {
    id: CompanyId,
    name: String,
    address: Address,
    primary_color: HexColor,
    default_template: Template,
    default_paper_size: PaperSize,
    is_active: bool,
    is_default: bool,
}

impl Company {
    pub fn id_typed(&self) -> CompanyId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn address(&self) -> &Address {
        &self.address
    }

    pub fn primary_color(&self) -> &HexColor {
        &self.primary_color
    }

    pub fn default_template(&self) -> Template {
        self.default_template
    }

    pub fn default_paper_size(&self) -> PaperSize {
        self.default_paper_size
    }

    pub fn is_active(&self) -> bool {
        self.is_active
    }

    pub fn is_default(&self) -> bool {
        self.is_default
    }

    /// Invariant helper: whether this company may appear on new documents.
    pub fn can_issue_documents(&self) -> bool {
        self.is_active
    }

    pub fn set_active(&mut self, active: bool) {
        self.is_active = active;
    }

    /// Store-internal: flip the default flag. See the store's transactional
    /// `set_default` for the at-most-one-per-user invariant.
    pub fn set_default_flag(&mut self, default: bool) {
        self.is_default = default;
    }

    /// Apply a validated form to an existing profile, keeping identity and flags.
    pub fn apply_form(&mut self, form: CompanyForm) -> Result<(), FieldErrors> {
        let validated = form.validate()?;
        self.name = validated.name;
        self.address = validated.address;
        self.primary_color = validated.primary_color;
        self.default_template = validated.default_template;
        self.default_paper_size = validated.default_paper_size;
        Ok(())
    }

    /// Rebuild an entity from stored fields (store-internal).
    #[allow(clippy::too_many_arguments)]
    pub fn from_stored(
        id: CompanyId,
        name: String,
        address: Address,
        primary_color: HexColor,
        default_template: Template,
        default_paper_size: PaperSize,
        is_active: bool,
        is_default: bool,
    ) -> Self {
        Self {
            id,
            name,
            address,
            primary_color,
            default_template,
            default_paper_size,
            is_active,
            is_default,
        }
    }
}

impl Entity for Company {
    type Id = CompanyId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// Raw form input for creating or updating a company profile.
///
/// Field values arrive as the user typed them; `validate()` reports every
/// violation keyed by field path.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanyForm {
    pub name: String,
    pub street: String,
    pub city: String,
    pub postal_code: String,
    pub country: String,
    pub primary_color: String,
    pub default_template: Template,
    pub default_paper_size: PaperSize,
}

/// Validated form output, consumed by `Company::create` / `apply_form`.
#[derive(Debug, Clone)]
pub struct ValidatedCompany {
    name: String,
    address: Address,
    primary_color: HexColor,
    default_template: Template,
    default_paper_size: PaperSize,
}

impl CompanyForm {
    pub fn validate(self) -> Result<ValidatedCompany, FieldErrors> {
        let mut errors = FieldErrors::new();

        let name = self.name.trim().to_string();
        if name.is_empty() {
            errors.push("name", "is required");
        }
        let street = self.street.trim().to_string();
        if street.is_empty() {
            errors.push("street", "is required");
        }
        let city = self.city.trim().to_string();
        if city.is_empty() {
            errors.push("city", "is required");
        }

        let primary_color = match HexColor::parse(&self.primary_color) {
            Ok(color) => Some(color),
            Err(msg) => {
                errors.push("primary_color", msg);
                None
            }
        };

        if !errors.is_empty() {
            return Err(errors);
        }

        Ok(ValidatedCompany {
            name,
            address: Address {
                street,
                city,
                postal_code: self.postal_code.trim().to_string(),
                country: self.country.trim().to_string(),
            },
            // Parse succeeded if we got here.
            primary_color: primary_color.unwrap_or_else(|| HexColor("#000000".into())),
            default_template: self.default_template,
            default_paper_size: self.default_paper_size,
        })
    }
}

impl Company {
    /// Create a new active, non-default company from form input.
    pub fn create(form: CompanyForm) -> Result<Self, FieldErrors> {
        let validated = form.validate()?;
        Ok(Self {
            id: CompanyId::new(AggregateId::new()),
            name: validated.name,
            address: validated.address,
            primary_color: validated.primary_color,
            default_template: validated.default_template,
            default_paper_size: validated.default_paper_size,
            is_active: true,
            is_default: false,
        })
    }
}
