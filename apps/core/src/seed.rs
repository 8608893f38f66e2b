//! Default knowledge-base articles and proactive rules.
//!
//! Loaders are idempotent: records whose title (articles) or name (rules)
//! already exists are skipped and counted.

use serde::Serialize;
use sqlx::sqlite::SqlitePool;
use sqlx::types::Json;
use tracing::{error, info};
use uuid::Uuid;

use crate::database;
use crate::error::AppError;
use crate::models::{ArticleLanguage, KnowledgeArticle, ProactiveRule};

/// Outcome of a seed run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SeedReport {
    pub created: usize,
    pub skipped: usize,
}

struct ArticleSeed {
    title: &'static str,
    category: &'static str,
    keywords: &'static [&'static str],
    question: &'static str,
    answer: &'static str,
    answer_urdu: &'static str,
    related_entity_type: Option<&'static str>,
}

const ARTICLES: &[ArticleSeed] = &[
    ArticleSeed {
        title: "How to create a Sales Invoice",
        category: "Sales",
        keywords: &["sales invoice", "create invoice", "billing", "customer invoice"],
        question: "How do I create a Sales Invoice?",
        answer: "Open Selling > Sales Invoice > New. Pick the Customer, add Items with quantity and rate, set the Posting Date and Payment Terms if needed, then Save and Submit. A Sales Invoice can also be made from a Sales Order or Delivery Note.",
        answer_urdu: "Selling > Sales Invoice > New کھولیں۔ Customer منتخب کریں، Items مقدار اور قیمت کے ساتھ شامل کریں، Posting Date سیٹ کریں، پھر Save اور Submit کریں۔ Sales Order یا Delivery Note سے بھی Sales Invoice بن سکتا ہے۔",
        related_entity_type: Some("Sales Invoice"),
    },
    ArticleSeed {
        title: "How to create a Quotation",
        category: "Sales",
        keywords: &["quotation", "quote", "customer quote", "sales quote"],
        question: "How do I create a Quotation for a customer?",
        answer: "Open Selling > Quotation > New. Choose a Customer or Lead, add Items, set the Valid Till date, then Save and Submit. Print it to send to the customer. Once accepted it converts directly into a Sales Order.",
        answer_urdu: "Selling > Quotation > New کھولیں۔ Customer یا Lead منتخب کریں، Items شامل کریں، Valid Till تاریخ سیٹ کریں، پھر Save اور Submit کریں۔ منظوری کے بعد اسے Sales Order میں بدلا جا سکتا ہے۔",
        related_entity_type: Some("Quotation"),
    },
    ArticleSeed {
        title: "How to create a Purchase Order",
        category: "Purchase",
        keywords: &["purchase order", "po", "supplier order", "buying"],
        question: "How do I create a Purchase Order?",
        answer: "Open Buying > Purchase Order > New. Select the Supplier, add Items with the required quantities and a Required By date, review prices and terms, then Save and Submit. POs can also be raised from a Material Request or Supplier Quotation.",
        answer_urdu: "Buying > Purchase Order > New کھولیں۔ Supplier منتخب کریں، Items اور Required By تاریخ شامل کریں، قیمتیں دیکھیں، پھر Save اور Submit کریں۔",
        related_entity_type: Some("Purchase Order"),
    },
    ArticleSeed {
        title: "How to create an Employee",
        category: "HR",
        keywords: &["employee", "new employee", "add employee", "staff"],
        question: "How do I add a new Employee?",
        answer: "Open HR > Employee > New. Enter First and Last Name, Gender, Date of Birth and Date of Joining, assign Company, Department and Designation, then Save. Link a User to give the employee portal access.",
        answer_urdu: "HR > Employee > New کھولیں۔ نام، جنس، تاریخ پیدائش اور Date of Joining درج کریں، Company، Department اور Designation منتخب کریں، پھر Save کریں۔",
        related_entity_type: Some("Employee"),
    },
    ArticleSeed {
        title: "How to mark Employee Attendance",
        category: "Attendance",
        keywords: &["attendance", "mark attendance", "present", "absent"],
        question: "How do I mark employee attendance?",
        answer: "Open HR > Attendance > New for one employee, or use Employee Attendance Tool to mark a whole department at once. Choose the date and status (Present, Absent, Half Day, On Leave) and Submit.",
        answer_urdu: "ایک employee کے لیے HR > Attendance > New کھولیں، یا پورے department کے لیے Employee Attendance Tool استعمال کریں۔ تاریخ اور status منتخب کر کے Submit کریں۔",
        related_entity_type: Some("Attendance"),
    },
    ArticleSeed {
        title: "How to create a Stock Entry",
        category: "Inventory",
        keywords: &["stock entry", "material transfer", "material receipt", "stock movement"],
        question: "How do I create a Stock Entry?",
        answer: "Open Stock > Stock Entry > New and pick the purpose: Material Receipt, Material Issue, Material Transfer or Manufacture. Set source and target warehouses, add Items with quantities, then Save and Submit.",
        answer_urdu: "Stock > Stock Entry > New کھولیں اور مقصد منتخب کریں: Material Receipt، Material Issue، Material Transfer یا Manufacture۔ Warehouses اور Items شامل کر کے Save اور Submit کریں۔",
        related_entity_type: Some("Stock Entry"),
    },
    ArticleSeed {
        title: "How to create a Payment Entry",
        category: "Accounting",
        keywords: &["payment entry", "payment", "receipt", "receive money"],
        question: "How do I record a payment?",
        answer: "Open Accounting > Payment Entry > New. Choose Receive or Pay, select the Party, enter the amount and mode of payment, allocate it against outstanding invoices, then Save and Submit. From an invoice, use Create > Payment to prefill it.",
        answer_urdu: "Accounting > Payment Entry > New کھولیں۔ Receive یا Pay منتخب کریں، Party اور رقم درج کریں، outstanding invoices کے خلاف allocate کریں، پھر Save اور Submit کریں۔",
        related_entity_type: Some("Payment Entry"),
    },
    ArticleSeed {
        title: "How to process Salary Slips",
        category: "Payroll",
        keywords: &["salary slip", "payroll", "salary processing", "wages"],
        question: "How do I process monthly salary slips?",
        answer: "Open Payroll > Payroll Entry > New, set the company, period and payroll payable account, click Get Employees, then Create Salary Slips. Review the drafts and Submit Salary Slip to post them.",
        answer_urdu: "Payroll > Payroll Entry > New کھولیں، company اور period سیٹ کریں، Get Employees پر کلک کریں، پھر Create Salary Slips۔ جائزہ لے کر Submit کریں۔",
        related_entity_type: Some("Salary Slip"),
    },
    ArticleSeed {
        title: "How to apply for Leave",
        category: "Leave",
        keywords: &["leave application", "apply leave", "time off", "vacation"],
        question: "How do employees apply for leave?",
        answer: "Open HR > Leave Application > New. Select the Leave Type, From and To dates and a reason, then Save. The leave approver is notified and approves or rejects it. Remaining balance shows on the form.",
        answer_urdu: "HR > Leave Application > New کھولیں۔ Leave Type، تاریخیں اور وجہ درج کر کے Save کریں۔ Leave approver کو اطلاع ملتی ہے اور وہ منظور یا مسترد کرتا ہے۔",
        related_entity_type: Some("Leave Application"),
    },
    ArticleSeed {
        title: "How to create a Lead",
        category: "CRM",
        keywords: &["lead", "prospect", "potential customer", "new lead"],
        question: "How do I create a Lead in CRM?",
        answer: "Open CRM > Lead > New. Enter the person or organization name, contact details and source, then Save. Track follow-ups from the form and convert the Lead to a Customer or Opportunity when it qualifies.",
        answer_urdu: "CRM > Lead > New کھولیں۔ نام، رابطے کی تفصیل اور source درج کر کے Save کریں۔ بعد میں Lead کو Customer یا Opportunity میں بدلا جا سکتا ہے۔",
        related_entity_type: Some("Lead"),
    },
    ArticleSeed {
        title: "How to use Awesome Bar for quick search",
        category: "General",
        keywords: &["awesome bar", "search", "quick search", "find", "ctrl+k"],
        question: "How do I quickly search in the ERP?",
        answer: "Press Ctrl+K or click the search bar at the top. Type a document name, list or report and pick a result. You can also type 'new sales invoice' to open a blank form directly.",
        answer_urdu: "Ctrl+K دبائیں یا اوپر search bar پر کلک کریں۔ document، list یا report کا نام لکھیں اور نتیجہ منتخب کریں۔",
        related_entity_type: None,
    },
];

struct RuleSeed {
    name: &'static str,
    description: &'static str,
    rule_type: &'static str,
    target_entity_type: &'static str,
    condition_expr: &'static str,
    message: &'static str,
    message_urdu: &'static str,
    priority: &'static str,
    frequency: &'static str,
}

const RULES: &[RuleSeed] = &[
    RuleSeed {
        name: "Low Stock Alert",
        description: "Alert when items fall below reorder level",
        rule_type: "Low Stock Alert",
        target_entity_type: "Bin",
        condition_expr: "actual_qty <= reorder_level and reorder_level > 0",
        message: "Low Stock Alert: some items are below their reorder level. Open Stock Balance and raise Purchase Orders to restock.",
        message_urdu: "کم اسٹاک: کچھ items reorder level سے نیچے ہیں۔ Stock Balance دیکھیں اور Purchase Orders بنائیں۔",
        priority: "High",
        frequency: "Daily",
    },
    RuleSeed {
        name: "Overdue Invoices",
        description: "Notify about overdue customer invoices",
        rule_type: "Overdue Invoice",
        target_entity_type: "Sales Invoice",
        condition_expr: "due_date < today() and outstanding_amount > 0 and docstatus == 1",
        message: "Overdue Invoices: some invoices are past due with payment outstanding. Follow up from Accounts Receivable.",
        message_urdu: "واجب الادا invoices: کچھ invoices کی due date گزر چکی ہے۔ Accounts Receivable سے follow up کریں۔",
        priority: "Critical",
        frequency: "Daily",
    },
    RuleSeed {
        name: "Pending Leave Approvals",
        description: "Remind about pending leave applications",
        rule_type: "Missing Document",
        target_entity_type: "Leave Application",
        condition_expr: "workflow_state == 'Pending' and docstatus == 0",
        message: "Pending Leave Approvals: leave applications are waiting for your approval.",
        message_urdu: "زیر التواء چھٹیاں: leave applications آپ کی منظوری کی منتظر ہیں۔",
        priority: "Medium",
        frequency: "Daily",
    },
    RuleSeed {
        name: "Expiring Contracts",
        description: "Alert about contracts expiring within 30 days",
        rule_type: "Expiring Contract",
        target_entity_type: "Contract",
        condition_expr: "end_date <= add_days(today(), 30) and end_date >= today() and is_signed == 1",
        message: "Expiring Contracts: some signed contracts end within 30 days. Review and renew if needed.",
        message_urdu: "ختم ہوتے معاہدے: کچھ contracts اگلے 30 دنوں میں ختم ہو رہے ہیں۔",
        priority: "High",
        frequency: "Weekly",
    },
    RuleSeed {
        name: "Unapproved Purchase Orders",
        description: "Remind about draft purchase orders",
        rule_type: "Missing Document",
        target_entity_type: "Purchase Order",
        condition_expr: "docstatus == 0",
        message: "Unapproved Purchase Orders: draft POs are waiting to be submitted.",
        message_urdu: "غیر منظور شدہ Purchase Orders: draft POs submit ہونے کے منتظر ہیں۔",
        priority: "Medium",
        frequency: "Daily",
    },
];

/// Inserts the default articles whose titles are not yet present.
pub async fn load_knowledge_base(pool: &SqlitePool) -> Result<SeedReport, AppError> {
    let mut report = SeedReport::default();

    for seed in ARTICLES {
        if database::article_title_exists(pool, seed.title).await? {
            report.skipped += 1;
            continue;
        }

        let article = KnowledgeArticle {
            id: Uuid::new_v4().to_string(),
            title: seed.title.to_string(),
            question: seed.question.to_string(),
            answer: seed.answer.to_string(),
            answer_urdu: Some(seed.answer_urdu.to_string()),
            category: seed.category.to_string(),
            language: ArticleLanguage::Bilingual,
            keywords: Json(seed.keywords.iter().map(|k| k.to_string()).collect()),
            usage_count: 0,
            helpful_count: 0,
            unhelpful_count: 0,
            related_entity_type: seed.related_entity_type.map(str::to_string),
            is_active: true,
        };

        match database::insert_article(pool, &article).await {
            Ok(()) => report.created += 1,
            Err(e) => error!(title = seed.title, error = %e, "Failed to seed article"),
        }
    }

    info!(created = report.created, skipped = report.skipped, "Knowledge base seeded");
    Ok(report)
}

/// Inserts the default proactive rules whose names are not yet present.
pub async fn load_proactive_rules(pool: &SqlitePool) -> Result<SeedReport, AppError> {
    let mut report = SeedReport::default();

    for seed in RULES {
        if database::rule_exists(pool, seed.name).await? {
            report.skipped += 1;
            continue;
        }

        let rule = ProactiveRule {
            name: seed.name.to_string(),
            description: Some(seed.description.to_string()),
            rule_type: seed.rule_type.to_string(),
            target_entity_type: Some(seed.target_entity_type.to_string()),
            condition_expr: seed.condition_expr.to_string(),
            message: seed.message.to_string(),
            message_urdu: Some(seed.message_urdu.to_string()),
            priority: seed.priority.to_string(),
            frequency: Some(seed.frequency.to_string()),
            is_active: true,
        };

        match database::insert_rule(pool, &rule).await {
            Ok(()) => report.created += 1,
            Err(e) => error!(rule = seed.name, error = %e, "Failed to seed proactive rule"),
        }
    }

    info!(created = report.created, skipped = report.skipped, "Proactive rules seeded");
    Ok(report)
}

/// Number of default articles shipped with the crate.
pub fn default_article_count() -> usize {
    ARTICLES.len()
}

/// Number of default proactive rules shipped with the crate.
pub fn default_rule_count() -> usize {
    RULES.len()
}
