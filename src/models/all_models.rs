use chrono::NaiveDateTime;
use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};
use strum_macros::{Display, EnumString};

//  USER & AUTHENTICATION STRUCTS

#[derive(Debug, Serialize, Deserialize, Display, EnumString, PartialEq, Eq, Clone, Copy, Hash)]
pub enum UserRole {
    Admin,
    Company,
    Employee,
    Chef,
    DeliveryPerson,
}

impl UserRole {
    pub const ALL: [UserRole; 5] = [
        UserRole::Admin,
        UserRole::Company,
        UserRole::Employee,
        UserRole::Chef,
        UserRole::DeliveryPerson,
    ];

    /// Claim (and serialized field) that carries this role's profile object.
    pub fn profile_claim(self) -> &'static str {
        match self {
            UserRole::Admin => "admin",
            UserRole::Company => "corporateCompany",
            UserRole::Employee => "employee",
            UserRole::Chef => "homeChef",
            UserRole::DeliveryPerson => "deliveryPerson",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdminDetails {
    #[serde(rename = "adminID", default, skip_serializing_if = "Option::is_none")]
    pub admin_id: Option<i64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompanyDetails {
    #[serde(rename = "companyID", default, skip_serializing_if = "Option::is_none")]
    pub company_id: Option<i64>,
    #[serde(rename = "companyName", default, skip_serializing_if = "Option::is_none")]
    pub company_name: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmployeeDetails {
    #[serde(rename = "employeeID", default, skip_serializing_if = "Option::is_none")]
    pub employee_id: Option<i64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HomeChefDetails {
    #[serde(rename = "homeChefID", default, skip_serializing_if = "Option::is_none")]
    pub home_chef_id: Option<i64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliveryPersonDetails {
    #[serde(rename = "deliveryPersonID", default, skip_serializing_if = "Option::is_none")]
    pub delivery_person_id: Option<i64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// The role-specific profile attached to a user. At most one exists per user.
#[derive(Debug, Clone, PartialEq)]
pub enum RoleDetails {
    Admin(AdminDetails),
    Company(CompanyDetails),
    Employee(EmployeeDetails),
    Chef(HomeChefDetails),
    DeliveryPerson(DeliveryPersonDetails),
}

impl RoleDetails {
    pub fn role(&self) -> UserRole {
        match self {
            RoleDetails::Admin(_) => UserRole::Admin,
            RoleDetails::Company(_) => UserRole::Company,
            RoleDetails::Employee(_) => UserRole::Employee,
            RoleDetails::Chef(_) => UserRole::Chef,
            RoleDetails::DeliveryPerson(_) => UserRole::DeliveryPerson,
        }
    }
}

/// User profile reconstructed from token claims.
///
/// Serializes to the flat shape the web client used: `userID`, `email`,
/// `role` and five nullable role profiles of which at most one is set.
#[derive(Debug, Clone, PartialEq)]
pub struct UserProfile {
    pub user_id: i64,
    pub email: String,
    pub role: UserRole,
    pub details: Option<RoleDetails>,
}

impl UserProfile {
    pub fn admin(&self) -> Option<&AdminDetails> {
        match &self.details {
            Some(RoleDetails::Admin(d)) => Some(d),
            _ => None,
        }
    }

    pub fn corporate_company(&self) -> Option<&CompanyDetails> {
        match &self.details {
            Some(RoleDetails::Company(d)) => Some(d),
            _ => None,
        }
    }

    pub fn employee(&self) -> Option<&EmployeeDetails> {
        match &self.details {
            Some(RoleDetails::Employee(d)) => Some(d),
            _ => None,
        }
    }

    pub fn home_chef(&self) -> Option<&HomeChefDetails> {
        match &self.details {
            Some(RoleDetails::Chef(d)) => Some(d),
            _ => None,
        }
    }

    pub fn delivery_person(&self) -> Option<&DeliveryPersonDetails> {
        match &self.details {
            Some(RoleDetails::DeliveryPerson(d)) => Some(d),
            _ => None,
        }
    }

    pub fn company_id(&self) -> Option<i64> {
        self.corporate_company().and_then(|c| c.company_id)
    }
}

impl Serialize for UserProfile {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("UserProfile", 8)?;
        s.serialize_field("userID", &self.user_id)?;
        s.serialize_field("email", &self.email)?;
        s.serialize_field("role", &self.role)?;
        s.serialize_field("admin", &self.admin())?;
        s.serialize_field("corporateCompany", &self.corporate_company())?;
        s.serialize_field("employee", &self.employee())?;
        s.serialize_field("homeChef", &self.home_chef())?;
        s.serialize_field("deliveryPerson", &self.delivery_person())?;
        s.end()
    }
}

//  API ENVELOPES

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ApiResponse<T> {
    #[serde(rename = "isSuccess", default)]
    pub is_success: bool,
    #[serde(default)]
    pub message: Option<String>,
    pub data: Option<T>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LoginData {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(rename = "userDto", default)]
    pub user_dto: Option<Value>,
}

//  SUBSCRIPTION PLANS & PAYMENTS

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct SubscriptionPlan {
    #[serde(rename = "subscriptionPlanID")]
    pub subscription_plan_id: i64,
    #[serde(rename = "planName")]
    pub plan_name: String,
    pub price: f64,
    #[serde(rename = "durationInDays")]
    pub duration_in_days: u32,
    #[serde(rename = "maxEmployees")]
    pub max_employees: u32,
    #[serde(rename = "mealLimitPerDay")]
    pub meal_limit_per_day: u32,
    #[serde(rename = "isCustomizable", default)]
    pub is_customizable: bool,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct SubscribeRequest {
    #[serde(rename = "CompanyId")]
    pub company_id: i64,
    #[serde(rename = "SubscriptionPlanId")]
    pub subscription_plan_id: i64,
    #[serde(rename = "StripeToken")]
    pub stripe_token: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Payment {
    #[serde(rename = "companyName")]
    pub company_name: String,
    #[serde(rename = "paymentDate", with = "flexible_datetime")]
    pub payment_date: NaiveDateTime,
    #[serde(rename = "paymentAmount")]
    pub payment_amount: f64,
    #[serde(rename = "paymentMethod")]
    pub payment_method: String,
    #[serde(rename = "planName", default)]
    pub plan_name: Option<String>,
}

//  ORDERS

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Meal {
    #[serde(rename = "mealID", default)]
    pub meal_id: Option<i64>,
    #[serde(rename = "mealName", default)]
    pub meal_name: Option<String>,
    pub price: f64,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Order {
    #[serde(rename = "orderID")]
    pub order_id: i64,
    #[serde(rename = "employeeID")]
    pub employee_id: i64,
    #[serde(rename = "orderDate", with = "flexible_datetime")]
    pub order_date: NaiveDateTime,
    #[serde(rename = "deliveryStatus")]
    pub delivery_status: String,
    #[serde(rename = "paymentStatus", default)]
    pub payment_status: Option<String>,
    #[serde(default)]
    pub meals: Vec<Meal>,
}

impl Order {
    pub fn total(&self) -> f64 {
        self.meals.iter().map(|m| m.price).sum()
    }
}

//  SALES REPORTING

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct TopDay {
    pub date: String,
    pub count: u32,
    pub revenue: f64,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SalesSummary {
    pub total_orders: u32,
    pub total_revenue: f64,
    pub orders_this_month: u32,
    pub orders_this_week: u32,
    pub revenue_this_month: f64,
    pub revenue_this_week: f64,
    pub average_order_value: f64,
    #[serde(default)]
    pub top_days: Vec<TopDay>,
}

/// The API emits timestamps both with and without an offset.
pub mod flexible_datetime {
    use chrono::{DateTime, NaiveDate, NaiveDateTime};
    use serde::{de, Deserialize, Deserializer, Serializer};

    const FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

    pub fn parse(raw: &str) -> Option<NaiveDateTime> {
        if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
            return Some(dt.naive_utc());
        }
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
            return Some(dt);
        }
        NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
    }

    pub fn serialize<S: Serializer>(
        value: &NaiveDateTime,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.format(FORMAT).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<NaiveDateTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).ok_or_else(|| de::Error::custom(format!("unrecognised timestamp `{raw}`")))
    }
}
