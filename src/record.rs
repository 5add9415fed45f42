//! Extracted loan record schema and the review editing model
//!
//! The remote workflow returns one record per uploaded recording, split
//! into five fixed sections of free-text fields. The schema is closed:
//! every addressable field is a [`FieldKey`] variant, so a write to a
//! field that does not exist cannot be expressed. The only stringly
//! entry point is `FieldKey::from_str`, used by the shell to resolve
//! `section.field` input, and it rejects unknown keys.

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Customer identity fields
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerDetails {
    #[serde(default)]
    pub effective_date: String,
    #[serde(default)]
    pub customer_name: String,
    #[serde(default)]
    pub customer_address: String,
    #[serde(default)]
    pub account_number: String,
    #[serde(default)]
    pub bvn_number: String,
}

/// Loan terms
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoanTerms {
    #[serde(default)]
    pub loan_amount_text: String,
    #[serde(default)]
    pub loan_amount_numeric: String,
    #[serde(default)]
    pub loan_tenure: String,
    #[serde(default)]
    pub monthly_repayment: String,
    #[serde(default)]
    pub repayment_date: String,
    #[serde(default)]
    pub interest_rate: String,
}

/// One-off fees attached to the loan
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeSchedule {
    #[serde(default)]
    pub management_fee: String,
    #[serde(default)]
    pub insurance_fee: String,
}

/// Issuing bank details
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BankDetails {
    #[serde(default)]
    pub bank_name: String,
    #[serde(default)]
    pub bank_code: String,
    #[serde(default)]
    pub branch_code: String,
    #[serde(default)]
    pub contact_email: String,
    #[serde(default)]
    pub contact_phone: String,
}

/// Internal verification trail
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationDetails {
    #[serde(default)]
    pub verification_code: String,
    #[serde(default)]
    pub reference_number: String,
    #[serde(default)]
    pub processing_date: String,
    #[serde(default)]
    pub approval_officer: String,
}

/// Full record extracted by the remote workflow from one audio upload
///
/// Received whole after the upload call, never partially fetched. A
/// missing field inside a section deserializes to the empty string; a
/// missing section is a malformed payload and fails the call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedRecord {
    #[serde(rename = "customerData")]
    pub customer: CustomerDetails,
    #[serde(rename = "loanData")]
    pub loan: LoanTerms,
    #[serde(rename = "feesData")]
    pub fees: FeeSchedule,
    #[serde(rename = "bankData")]
    pub bank: BankDetails,
    #[serde(rename = "verificationData")]
    pub verification: VerificationDetails,
}

/// The five record sections
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Section {
    Customer,
    Loan,
    Fees,
    Bank,
    Verification,
}

impl Section {
    /// All sections in display order
    pub const ALL: [Section; 5] = [
        Section::Customer,
        Section::Loan,
        Section::Fees,
        Section::Bank,
        Section::Verification,
    ];

    /// Heading shown above the section during review
    pub fn title(&self) -> &'static str {
        match self {
            Section::Customer => "Customer Information",
            Section::Loan => "Loan Details",
            Section::Fees => "Fees Information",
            Section::Bank => "Bank Details",
            Section::Verification => "Verification Data",
        }
    }

    /// Fields belonging to this section, in display order
    pub fn fields(&self) -> impl Iterator<Item = FieldKey> + '_ {
        FieldKey::ALL.iter().copied().filter(|f| f.section() == *self)
    }
}

impl std::fmt::Display for Section {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Section::Customer => write!(f, "customer"),
            Section::Loan => write!(f, "loan"),
            Section::Fees => write!(f, "fees"),
            Section::Bank => write!(f, "bank"),
            Section::Verification => write!(f, "verification"),
        }
    }
}

impl std::str::FromStr for Section {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "customer" => Ok(Section::Customer),
            "loan" => Ok(Section::Loan),
            "fees" => Ok(Section::Fees),
            "bank" => Ok(Section::Bank),
            "verification" => Ok(Section::Verification),
            _ => Err(Error::UnknownField(s.to_string())),
        }
    }
}

/// Addressable field within the record
///
/// Covers every field of every section; there is exactly one variant per
/// schema field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKey {
    EffectiveDate,
    CustomerName,
    CustomerAddress,
    AccountNumber,
    BvnNumber,
    LoanAmountText,
    LoanAmountNumeric,
    LoanTenure,
    MonthlyRepayment,
    RepaymentDate,
    InterestRate,
    ManagementFee,
    InsuranceFee,
    BankName,
    BankCode,
    BranchCode,
    ContactEmail,
    ContactPhone,
    VerificationCode,
    ReferenceNumber,
    ProcessingDate,
    ApprovalOfficer,
}

impl FieldKey {
    /// All fields in display order
    pub const ALL: [FieldKey; 22] = [
        FieldKey::EffectiveDate,
        FieldKey::CustomerName,
        FieldKey::CustomerAddress,
        FieldKey::AccountNumber,
        FieldKey::BvnNumber,
        FieldKey::LoanAmountText,
        FieldKey::LoanAmountNumeric,
        FieldKey::LoanTenure,
        FieldKey::MonthlyRepayment,
        FieldKey::RepaymentDate,
        FieldKey::InterestRate,
        FieldKey::ManagementFee,
        FieldKey::InsuranceFee,
        FieldKey::BankName,
        FieldKey::BankCode,
        FieldKey::BranchCode,
        FieldKey::ContactEmail,
        FieldKey::ContactPhone,
        FieldKey::VerificationCode,
        FieldKey::ReferenceNumber,
        FieldKey::ProcessingDate,
        FieldKey::ApprovalOfficer,
    ];

    /// Section this field belongs to
    pub fn section(&self) -> Section {
        use FieldKey::*;
        match self {
            EffectiveDate | CustomerName | CustomerAddress | AccountNumber | BvnNumber => {
                Section::Customer
            }
            LoanAmountText | LoanAmountNumeric | LoanTenure | MonthlyRepayment
            | RepaymentDate | InterestRate => Section::Loan,
            ManagementFee | InsuranceFee => Section::Fees,
            BankName | BankCode | BranchCode | ContactEmail | ContactPhone => Section::Bank,
            VerificationCode | ReferenceNumber | ProcessingDate | ApprovalOfficer => {
                Section::Verification
            }
        }
    }

    /// Wire name of the field within its section
    pub fn name(&self) -> &'static str {
        use FieldKey::*;
        match self {
            EffectiveDate => "effective_date",
            CustomerName => "customer_name",
            CustomerAddress => "customer_address",
            AccountNumber => "account_number",
            BvnNumber => "bvn_number",
            LoanAmountText => "loan_amount_text",
            LoanAmountNumeric => "loan_amount_numeric",
            LoanTenure => "loan_tenure",
            MonthlyRepayment => "monthly_repayment",
            RepaymentDate => "repayment_date",
            InterestRate => "interest_rate",
            ManagementFee => "management_fee",
            InsuranceFee => "insurance_fee",
            BankName => "bank_name",
            BankCode => "bank_code",
            BranchCode => "branch_code",
            ContactEmail => "contact_email",
            ContactPhone => "contact_phone",
            VerificationCode => "verification_code",
            ReferenceNumber => "reference_number",
            ProcessingDate => "processing_date",
            ApprovalOfficer => "approval_officer",
        }
    }

    /// Human label shown during review
    pub fn label(&self) -> &'static str {
        use FieldKey::*;
        match self {
            EffectiveDate => "Effective Date",
            CustomerName => "Customer Name",
            CustomerAddress => "Address",
            AccountNumber => "Account Number",
            BvnNumber => "BVN Number",
            LoanAmountText => "Loan Amount (Text)",
            LoanAmountNumeric => "Loan Amount (Numeric)",
            LoanTenure => "Loan Tenure",
            MonthlyRepayment => "Monthly Repayment",
            RepaymentDate => "Repayment Date",
            InterestRate => "Interest Rate",
            ManagementFee => "Management Fee",
            InsuranceFee => "Insurance Fee",
            BankName => "Bank Name",
            BankCode => "Bank Code",
            BranchCode => "Branch Code",
            ContactEmail => "Contact Email",
            ContactPhone => "Contact Phone",
            VerificationCode => "Verification Code",
            ReferenceNumber => "Reference Number",
            ProcessingDate => "Processing Date",
            ApprovalOfficer => "Approval Officer",
        }
    }

    /// Read this field's value from a record
    pub fn get<'a>(&self, record: &'a ExtractedRecord) -> &'a str {
        use FieldKey::*;
        match self {
            EffectiveDate => &record.customer.effective_date,
            CustomerName => &record.customer.customer_name,
            CustomerAddress => &record.customer.customer_address,
            AccountNumber => &record.customer.account_number,
            BvnNumber => &record.customer.bvn_number,
            LoanAmountText => &record.loan.loan_amount_text,
            LoanAmountNumeric => &record.loan.loan_amount_numeric,
            LoanTenure => &record.loan.loan_tenure,
            MonthlyRepayment => &record.loan.monthly_repayment,
            RepaymentDate => &record.loan.repayment_date,
            InterestRate => &record.loan.interest_rate,
            ManagementFee => &record.fees.management_fee,
            InsuranceFee => &record.fees.insurance_fee,
            BankName => &record.bank.bank_name,
            BankCode => &record.bank.bank_code,
            BranchCode => &record.bank.branch_code,
            ContactEmail => &record.bank.contact_email,
            ContactPhone => &record.bank.contact_phone,
            VerificationCode => &record.verification.verification_code,
            ReferenceNumber => &record.verification.reference_number,
            ProcessingDate => &record.verification.processing_date,
            ApprovalOfficer => &record.verification.approval_officer,
        }
    }

    fn get_mut<'a>(&self, record: &'a mut ExtractedRecord) -> &'a mut String {
        use FieldKey::*;
        match self {
            EffectiveDate => &mut record.customer.effective_date,
            CustomerName => &mut record.customer.customer_name,
            CustomerAddress => &mut record.customer.customer_address,
            AccountNumber => &mut record.customer.account_number,
            BvnNumber => &mut record.customer.bvn_number,
            LoanAmountText => &mut record.loan.loan_amount_text,
            LoanAmountNumeric => &mut record.loan.loan_amount_numeric,
            LoanTenure => &mut record.loan.loan_tenure,
            MonthlyRepayment => &mut record.loan.monthly_repayment,
            RepaymentDate => &mut record.loan.repayment_date,
            InterestRate => &mut record.loan.interest_rate,
            ManagementFee => &mut record.fees.management_fee,
            InsuranceFee => &mut record.fees.insurance_fee,
            BankName => &mut record.bank.bank_name,
            BankCode => &mut record.bank.bank_code,
            BranchCode => &mut record.bank.branch_code,
            ContactEmail => &mut record.bank.contact_email,
            ContactPhone => &mut record.bank.contact_phone,
            VerificationCode => &mut record.verification.verification_code,
            ReferenceNumber => &mut record.verification.reference_number,
            ProcessingDate => &mut record.verification.processing_date,
            ApprovalOfficer => &mut record.verification.approval_officer,
        }
    }
}

impl std::fmt::Display for FieldKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.section(), self.name())
    }
}

impl std::str::FromStr for FieldKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let (section, field) = s
            .split_once('.')
            .ok_or_else(|| Error::UnknownField(s.to_string()))?;
        let section: Section = section.parse()?;

        let found = section
            .fields()
            .find(|key| key.name() == field)
            .ok_or_else(|| Error::UnknownField(s.to_string()));
        found
    }
}

/// In-memory editing model used during the review stage
///
/// Holds the pristine extraction plus a working copy of the same shape.
/// Edits touch only the working copy; `commit` hands out the current
/// snapshot for submission without resetting it.
#[derive(Debug, Clone)]
pub struct RecordEditor {
    original: ExtractedRecord,
    edited: ExtractedRecord,
}

impl RecordEditor {
    /// Seed the editor with an extraction; the working copy starts equal
    pub fn new(extracted: ExtractedRecord) -> Self {
        Self {
            edited: extracted.clone(),
            original: extracted,
        }
    }

    /// Overwrite one field in the working copy
    pub fn set(&mut self, key: FieldKey, value: impl Into<String>) {
        *key.get_mut(&mut self.edited) = value.into();
    }

    /// Restore one field to the value held in the original extraction
    pub fn discard(&mut self, key: FieldKey) {
        let original = key.get(&self.original).to_string();
        *key.get_mut(&mut self.edited) = original;
    }

    /// Current value of one field in the working copy
    pub fn value(&self, key: FieldKey) -> &str {
        key.get(&self.edited)
    }

    /// Whether the field differs from the extracted value
    pub fn is_edited(&self, key: FieldKey) -> bool {
        key.get(&self.edited) != key.get(&self.original)
    }

    /// The pristine extraction
    pub fn original(&self) -> &ExtractedRecord {
        &self.original
    }

    /// The working copy
    pub fn edited(&self) -> &ExtractedRecord {
        &self.edited
    }

    /// Snapshot of the working copy for submission; edits are kept
    pub fn commit(&self) -> ExtractedRecord {
        self.edited.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ExtractedRecord {
        let mut record = ExtractedRecord::default();
        record.customer.customer_name = "Ada Obi".to_string();
        record.loan.loan_amount_numeric = "500000".to_string();
        record.bank.bank_name = "First Bank".to_string();
        record
    }

    #[test]
    fn test_field_key_parse() {
        let key: FieldKey = "customer.customer_name".parse().unwrap();
        assert_eq!(key, FieldKey::CustomerName);

        let key: FieldKey = "verification.approval_officer".parse().unwrap();
        assert_eq!(key, FieldKey::ApprovalOfficer);
    }

    #[test]
    fn test_field_key_parse_rejects_unknown() {
        assert!("customer.shoe_size".parse::<FieldKey>().is_err());
        assert!("warehouse.bank_name".parse::<FieldKey>().is_err());
        assert!("no_dot_here".parse::<FieldKey>().is_err());
        // Field exists, but in a different section
        assert!("loan.bank_name".parse::<FieldKey>().is_err());
    }

    #[test]
    fn test_field_key_display_roundtrip() {
        for key in FieldKey::ALL {
            let parsed: FieldKey = key.to_string().parse().unwrap();
            assert_eq!(parsed, key);
        }
    }

    #[test]
    fn test_sections_cover_all_fields() {
        let total: usize = Section::ALL.iter().map(|s| s.fields().count()).sum();
        assert_eq!(total, FieldKey::ALL.len());
    }

    #[test]
    fn test_editor_set_and_commit() {
        let mut editor = RecordEditor::new(sample());
        editor.set(FieldKey::CustomerName, "Ada Obi-Nwosu");

        assert_eq!(editor.value(FieldKey::CustomerName), "Ada Obi-Nwosu");
        assert!(editor.is_edited(FieldKey::CustomerName));

        let committed = editor.commit();
        assert_eq!(committed.customer.customer_name, "Ada Obi-Nwosu");
        // Commit is a snapshot, not a reset
        assert_eq!(editor.value(FieldKey::CustomerName), "Ada Obi-Nwosu");
        // The original extraction is never touched
        assert_eq!(editor.original().customer.customer_name, "Ada Obi");
    }

    #[test]
    fn test_editor_discard_restores_single_field() {
        let mut editor = RecordEditor::new(sample());
        editor.set(FieldKey::CustomerName, "changed");
        editor.set(FieldKey::BankName, "also changed");

        editor.discard(FieldKey::CustomerName);

        assert_eq!(editor.value(FieldKey::CustomerName), "Ada Obi");
        assert_eq!(editor.value(FieldKey::BankName), "also changed");
    }

    #[test]
    fn test_editor_preserves_shape() {
        let mut editor = RecordEditor::new(sample());
        for key in FieldKey::ALL {
            editor.set(key, format!("value for {}", key));
        }
        for key in FieldKey::ALL {
            editor.discard(key);
        }
        assert_eq!(editor.edited(), editor.original());
    }

    #[test]
    fn test_record_wire_format() {
        let json = serde_json::to_value(sample()).unwrap();
        assert!(json.get("customerData").is_some());
        assert!(json.get("loanData").is_some());
        assert!(json.get("feesData").is_some());
        assert!(json.get("bankData").is_some());
        assert!(json.get("verificationData").is_some());
        assert_eq!(json["customerData"]["customer_name"], "Ada Obi");
    }

    #[test]
    fn test_record_missing_fields_default_empty() {
        let json = serde_json::json!({
            "customerData": { "customer_name": "Ada Obi" },
            "loanData": {},
            "feesData": {},
            "bankData": {},
            "verificationData": {}
        });
        let record: ExtractedRecord = serde_json::from_value(json).unwrap();
        assert_eq!(record.customer.customer_name, "Ada Obi");
        assert_eq!(record.customer.account_number, "");
    }

    #[test]
    fn test_record_missing_section_is_error() {
        let json = serde_json::json!({
            "customerData": {},
            "loanData": {}
        });
        assert!(serde_json::from_value::<ExtractedRecord>(json).is_err());
    }
}
