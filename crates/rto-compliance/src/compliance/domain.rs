use chrono::NaiveDate;
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

macro_rules! record_id {
    ($($name:ident),+ $(,)?) => {
        $(
            #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
            #[serde(transparent)]
            pub struct $name(pub u64);

            impl fmt::Display for $name {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    write!(f, "{}", self.0)
                }
            }
        )+
    };
}

record_id!(UserId, BranchId, CitizenId, VehicleId, DocumentId, LicenseId, RegistryId);

/// Branch whose managers are never restricted to their own branch.
pub const EXEMPT_BRANCH_NAME: &str = "Dhamtari";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Manager,
    #[serde(alias = "user")]
    Citizen,
}

impl Role {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "admin" => Some(Self::Admin),
            "manager" => Some(Self::Manager),
            "citizen" | "user" => Some(Self::Citizen),
            _ => None,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Manager => "manager",
            Self::Citizen => "citizen",
        }
    }

    pub const fn is_staff(self) -> bool {
        matches!(self, Self::Admin | Self::Manager)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Branch {
    pub id: BranchId,
    pub name: String,
}

/// Authenticated caller as forwarded by the session layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub id: UserId,
    pub role: Role,
    pub branch: Option<Branch>,
}

/// System account row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub role: Role,
    #[serde(default)]
    pub branch_id: Option<BranchId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Citizen {
    pub id: CitizenId,
    pub name: String,
    pub mobile: String,
    /// Staff account that registered the profile; drives branch scoping.
    pub user_id: UserId,
    /// Self-service login linked to this profile, if any.
    #[serde(default)]
    pub account_id: Option<UserId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vehicle {
    pub id: VehicleId,
    pub citizen_id: CitizenId,
    pub registration_no: String,
    #[serde(default)]
    pub vehicle_type: Option<String>,
    #[serde(default)]
    pub make_model: Option<String>,
    #[serde(default)]
    pub chassis_no: Option<String>,
    #[serde(default)]
    pub engine_no: Option<String>,
}

/// Legacy learner license, recorded against a citizen profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LearnerLicense {
    pub id: LicenseId,
    pub citizen_id: CitizenId,
    #[serde(default)]
    pub ll_no: Option<String>,
    #[serde(default)]
    pub application_no: Option<String>,
    #[serde(default)]
    pub issue_date: Option<NaiveDate>,
    #[serde(default)]
    pub expiry_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrivingLicense {
    pub id: LicenseId,
    pub citizen_id: CitizenId,
    #[serde(default)]
    pub dl_no: Option<String>,
    #[serde(default)]
    pub application_no: Option<String>,
    #[serde(default)]
    pub issue_date: Option<NaiveDate>,
    #[serde(default)]
    pub expiry_date: Option<NaiveDate>,
}

/// Flat learner-license ledger entry. Keyed by free-text name and mobile,
/// never linked to a citizen profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LlRegistryEntry {
    pub id: RegistryId,
    pub name: String,
    pub mobile: String,
    #[serde(default)]
    pub given_by: Option<String>,
    #[serde(default)]
    pub application_no: Option<String>,
    #[serde(default)]
    pub ll_no: Option<String>,
    #[serde(default)]
    pub dob: Option<NaiveDate>,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    /// Amounts are held in paise; exports carry rupees with two decimals.
    #[serde(default, deserialize_with = "rupees_as_paise")]
    pub payment_asked: i64,
    #[serde(default, deserialize_with = "rupees_as_paise")]
    pub payment_paid: i64,
    #[serde(default)]
    pub aadhar_path: Option<String>,
}

/// Reads a rupee amount (`500`, `500.5`, `500.00`) as paise. Blank or null
/// cells are zero.
fn rupees_as_paise<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    struct RupeeVisitor;

    impl<'de> Visitor<'de> for RupeeVisitor {
        type Value = i64;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a rupee amount with at most two decimals")
        }

        fn visit_str<E: de::Error>(self, value: &str) -> Result<i64, E> {
            parse_paise(value)
                .ok_or_else(|| E::custom(format!("invalid rupee amount '{value}'")))
        }

        fn visit_i64<E: de::Error>(self, value: i64) -> Result<i64, E> {
            value
                .checked_mul(100)
                .ok_or_else(|| E::custom("rupee amount out of range"))
        }

        fn visit_u64<E: de::Error>(self, value: u64) -> Result<i64, E> {
            i64::try_from(value)
                .map_err(|_| E::custom("rupee amount out of range"))
                .and_then(|value| self.visit_i64(value))
        }

        fn visit_f64<E: de::Error>(self, value: f64) -> Result<i64, E> {
            self.visit_str(&format!("{value:.2}"))
        }

        fn visit_unit<E: de::Error>(self) -> Result<i64, E> {
            Ok(0)
        }

        fn visit_none<E: de::Error>(self) -> Result<i64, E> {
            Ok(0)
        }

        fn visit_some<D2: Deserializer<'de>>(self, deserializer: D2) -> Result<i64, D2::Error> {
            deserializer.deserialize_any(self)
        }
    }

    deserializer.deserialize_any(RupeeVisitor)
}

fn parse_paise(raw: &str) -> Option<i64> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Some(0);
    }
    let (negative, digits) = match raw.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, raw),
    };
    let (whole, fraction) = digits.split_once('.').unwrap_or((digits, ""));
    let all_digits = |part: &str| part.bytes().all(|byte| byte.is_ascii_digit());
    if whole.is_empty() || fraction.len() > 2 || !all_digits(whole) || !all_digits(fraction) {
        return None;
    }

    let fraction_paise = match fraction.len() {
        0 => 0,
        1 => fraction.parse::<i64>().ok()? * 10,
        _ => fraction.parse::<i64>().ok()?,
    };
    let paise = whole
        .parse::<i64>()
        .ok()?
        .checked_mul(100)?
        .checked_add(fraction_paise)?;
    Some(if negative { -paise } else { paise })
}

impl LlRegistryEntry {
    /// Outstanding amount; negative when the holder overpaid.
    pub fn balance(&self) -> i64 {
        self.payment_asked - self.payment_paid
    }

    pub fn has_due(&self) -> bool {
        self.balance() > 0
    }
}

/// The seven per-vehicle compliance document collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    Tax,
    Insurance,
    Fitness,
    Permit,
    Pucc,
    Vltd,
    SpeedGovernor,
}

impl DocumentKind {
    pub const fn ordered() -> [Self; 7] {
        [
            Self::Tax,
            Self::Insurance,
            Self::Fitness,
            Self::Permit,
            Self::Pucc,
            Self::Vltd,
            Self::SpeedGovernor,
        ]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Tax => "Tax",
            Self::Insurance => "Insurance",
            Self::Fitness => "Fitness",
            Self::Permit => "Permit",
            Self::Pucc => "PUCC",
            Self::Vltd => "VLTd",
            Self::SpeedGovernor => "Speed Governor",
        }
    }

    /// Column holding the expiry-like date in the source table.
    pub const fn expiry_column(self) -> &'static str {
        match self {
            Self::Tax => "tax_upto",
            Self::Insurance => "end_date",
            Self::Pucc => "valid_until",
            Self::Fitness | Self::Permit | Self::Vltd | Self::SpeedGovernor => "expiry_date",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        let normalized = raw.trim().to_ascii_lowercase().replace([' ', '-'], "_");
        match normalized.as_str() {
            "tax" => Some(Self::Tax),
            "insurance" => Some(Self::Insurance),
            "fitness" => Some(Self::Fitness),
            "permit" => Some(Self::Permit),
            "pucc" => Some(Self::Pucc),
            "vltd" => Some(Self::Vltd),
            "speed_governor" => Some(Self::SpeedGovernor),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VehicleTax {
    pub id: DocumentId,
    pub vehicle_id: VehicleId,
    #[serde(default)]
    pub tax_mode: Option<String>,
    #[serde(default)]
    pub tax_from: Option<NaiveDate>,
    #[serde(default)]
    pub tax_upto: Option<NaiveDate>,
    #[serde(default)]
    pub amount: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VehicleInsurance {
    pub id: DocumentId,
    pub vehicle_id: VehicleId,
    #[serde(default)]
    pub company_name: Option<String>,
    #[serde(default)]
    pub insurance_type: Option<String>,
    #[serde(default)]
    pub policy_number: Option<String>,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VehicleFitness {
    pub id: DocumentId,
    pub vehicle_id: VehicleId,
    #[serde(default)]
    pub certificate_number: Option<String>,
    #[serde(default)]
    pub issue_date: Option<NaiveDate>,
    #[serde(default)]
    pub expiry_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VehiclePermit {
    pub id: DocumentId,
    pub vehicle_id: VehicleId,
    #[serde(default)]
    pub permit_number: Option<String>,
    #[serde(default)]
    pub permit_type: Option<String>,
    #[serde(default)]
    pub issue_date: Option<NaiveDate>,
    #[serde(default)]
    pub expiry_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VehiclePucc {
    pub id: DocumentId,
    pub vehicle_id: VehicleId,
    #[serde(default)]
    pub pucc_number: Option<String>,
    #[serde(default)]
    pub valid_from: Option<NaiveDate>,
    #[serde(default)]
    pub valid_until: Option<NaiveDate>,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VehicleVltd {
    pub id: DocumentId,
    pub vehicle_id: VehicleId,
    #[serde(default)]
    pub vendor_name: Option<String>,
    #[serde(default)]
    pub issue_date: Option<NaiveDate>,
    #[serde(default)]
    pub expiry_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VehicleSpeedGovernor {
    pub id: DocumentId,
    pub vehicle_id: VehicleId,
    #[serde(default)]
    pub vendor_name: Option<String>,
    #[serde(default)]
    pub issue_date: Option<NaiveDate>,
    #[serde(default)]
    pub expiry_date: Option<NaiveDate>,
}

/// A row from any of the seven vehicle document collections.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum DocumentRecord {
    Tax(VehicleTax),
    Insurance(VehicleInsurance),
    Fitness(VehicleFitness),
    Permit(VehiclePermit),
    Pucc(VehiclePucc),
    Vltd(VehicleVltd),
    SpeedGovernor(VehicleSpeedGovernor),
}

impl DocumentRecord {
    pub fn kind(&self) -> DocumentKind {
        match self {
            Self::Tax(_) => DocumentKind::Tax,
            Self::Insurance(_) => DocumentKind::Insurance,
            Self::Fitness(_) => DocumentKind::Fitness,
            Self::Permit(_) => DocumentKind::Permit,
            Self::Pucc(_) => DocumentKind::Pucc,
            Self::Vltd(_) => DocumentKind::Vltd,
            Self::SpeedGovernor(_) => DocumentKind::SpeedGovernor,
        }
    }

    pub fn id(&self) -> DocumentId {
        match self {
            Self::Tax(record) => record.id,
            Self::Insurance(record) => record.id,
            Self::Fitness(record) => record.id,
            Self::Permit(record) => record.id,
            Self::Pucc(record) => record.id,
            Self::Vltd(record) => record.id,
            Self::SpeedGovernor(record) => record.id,
        }
    }

    pub fn vehicle_id(&self) -> VehicleId {
        match self {
            Self::Tax(record) => record.vehicle_id,
            Self::Insurance(record) => record.vehicle_id,
            Self::Fitness(record) => record.vehicle_id,
            Self::Permit(record) => record.vehicle_id,
            Self::Pucc(record) => record.vehicle_id,
            Self::Vltd(record) => record.vehicle_id,
            Self::SpeedGovernor(record) => record.vehicle_id,
        }
    }
}
