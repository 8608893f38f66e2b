//! Fixed replies used when neither the knowledge base nor a provider answered.

use crate::brain::intent::Intent;
use crate::models::{AnswerResult, AnswerSource, Language};

pub const CONTEXT_CONFIDENCE: u8 = 85;
pub const INTENT_CONFIDENCE: u8 = 70;
pub const DEFAULT_CONFIDENCE: u8 = 50;

/// Template for a chat opened from a screen of `entity_type`, if one exists.
pub fn context_reply(entity_type: &str, language: Language) -> Option<AnswerResult> {
    let answer = match (entity_type, language) {
        ("Sales Invoice", Language::English) => "I can help you with Sales Invoices. Common actions: Create new invoice, Check payment status, Print invoice, Submit invoice. What would you like to do?",
        ("Sales Invoice", Language::Urdu) => "میں Sales Invoices میں مدد کر سکتا ہوں۔ عام کام: نیا invoice بنانا، payment status چیک کرنا، invoice print کرنا۔ آپ کیا کرنا چاہتے ہیں؟",
        ("Purchase Order", Language::English) => "I can help with Purchase Orders. You can: Create PO, Receive items, Check status, or Amend PO. What do you need?",
        ("Purchase Order", Language::Urdu) => "میں Purchase Orders میں مدد کر سکتا ہوں۔ آپ کر سکتے ہیں: PO بنانا، items receive کرنا، status چیک کرنا۔ کیا چاہیے؟",
        ("Employee", Language::English) => "I can help with Employee records. You can: View attendance, Check leave balance, Update details, or Create salary slip. What would you like to know?",
        ("Employee", Language::Urdu) => "میں Employee records میں مدد کر سکتا ہوں۔ آپ دیکھ سکتے ہیں: Attendance، Leave balance، Details update کرنا۔ کیا جاننا چاہتے ہیں؟",
        ("Stock Entry", Language::English) => "I can help with Stock Entries. Common operations: Material Transfer, Receipt, Issue, Manufacture. What do you need help with?",
        ("Stock Entry", Language::Urdu) => "میں Stock Entries میں مدد کر سکتا ہوں۔ عام operations: Material Transfer، Receipt، Issue، Manufacture۔ کیا مدد چاہیے؟",
        ("Customer", Language::English) => "I can help manage Customer records. You can: View history, Check outstanding, Create quotation, or Update details. What would you like to do?",
        ("Customer", Language::Urdu) => "میں Customer records manage کرنے میں مدد کروں گا۔ آپ کر سکتے ہیں: History دیکھنا، Outstanding چیک کرنا، Quotation بنانا۔",
        _ => return None,
    };

    Some(fixed(answer, AnswerSource::ContextAware, CONTEXT_CONFIDENCE))
}

/// Template for `intent`. `General` has none.
pub fn intent_reply(intent: Intent, language: Language) -> Option<AnswerResult> {
    let answer = match (intent, language) {
        (Intent::HowTo, Language::English) => "To help you better, could you please specify which module or feature you need help with? For example: Sales, Purchase, HR, Inventory, etc.",
        (Intent::HowTo, Language::Urdu) => "آپ کی مدد کرنے کے لیے، براہ کرم بتائیں کہ آپ کو کس ماڈیول یا فیچر میں مدد چاہیے؟ مثال: Sales, Purchase, HR, Inventory",
        (Intent::WhatIs, Language::English) => "I can explain ERP concepts. Please specify what you'd like to know about.",
        (Intent::WhatIs, Language::Urdu) => "میں ERP کے تصورات سمجھا سکتا ہوں۔ براہ کرم بتائیں آپ کیا جاننا چاہتے ہیں۔",
        (Intent::Create, Language::English) => "I can guide you on creating documents. Which document type would you like to create?",
        (Intent::Create, Language::Urdu) => "میں آپ کو documents بنانے میں مدد کر سکتا ہوں۔ آپ کون سا document بنانا چاہتے ہیں؟",
        (Intent::Error, Language::English) => "I'd be happy to help troubleshoot. Could you please describe the error or issue in more detail?",
        (Intent::Error, Language::Urdu) => "میں مسئلہ حل کرنے میں مدد کروں گا۔ براہ کرم error یا issue کی تفصیل بتائیں۔",
        (Intent::Find, Language::English) => "You can use the Awesome Bar (Ctrl+K) to search globally. What specifically are you looking for?",
        (Intent::Find, Language::Urdu) => "آپ Awesome Bar (Ctrl+K) استعمال کر کے تلاش کر سکتے ہیں۔ آپ کیا ڈھونڈ رہے ہیں؟",
        (Intent::Report, Language::English) => "There are many built-in reports. Which module's reports are you interested in?",
        (Intent::Report, Language::Urdu) => "یہاں بہت سی رپورٹس ہیں۔ آپ کو کس ماڈیول کی رپورٹس چاہیے؟",
        (Intent::Setup, Language::English) => "I can help with setup. Which area would you like to configure?",
        (Intent::Setup, Language::Urdu) => "میں setup میں مدد کر سکتا ہوں۔ آپ کیا configure کرنا چاہتے ہیں؟",
        (Intent::General, _) => return None,
    };

    Some(fixed(answer, AnswerSource::RuleBased, INTENT_CONFIDENCE))
}

/// Greeting/help message used when nothing else applied.
pub fn default_reply(language: Language) -> AnswerResult {
    let answer = match language {
        Language::English => "I'm here to help! Please ask your question in detail. You can ask me about any module: Sales, Purchase, Inventory, HR, Accounting, Manufacturing, etc. How can I assist you today?",
        Language::Urdu => "میں آپ کی مدد کے لیے حاضر ہوں! براہ کرم اپنا سوال تفصیل سے پوچھیں۔ آپ مجھ سے کسی بھی module کے بارے میں پوچھ سکتے ہیں: Sales, Purchase, Inventory, HR, Accounting, Manufacturing, وغیرہ۔",
    };

    fixed(answer, AnswerSource::RuleBased, DEFAULT_CONFIDENCE)
}

/// Apology returned by the request handler when a request fails outright.
pub const APOLOGY: &str = "Sorry, I encountered an error. Please try again.";

fn fixed(answer: &str, source: AnswerSource, confidence: u8) -> AnswerResult {
    AnswerResult {
        answer: answer.to_string(),
        source,
        confidence,
        suggestions: Vec::new(),
    }
}
