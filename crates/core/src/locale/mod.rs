use serde::{Deserialize, Serialize};

use crate::chat::FailureKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    En,
    Ar,
}

impl Language {
    pub fn parse(raw: &str) -> Option<Self> {
        let lower = raw.trim().to_ascii_lowercase();
        let primary = lower.split(['-', '_']).next().unwrap_or_default();
        match primary {
            "en" => Some(Language::En),
            "ar" => Some(Language::Ar),
            _ => None,
        }
    }

    pub fn is_rtl(self) -> bool {
        matches!(self, Language::Ar)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Localized {
    pub en: &'static str,
    pub ar: &'static str,
}

impl Localized {
    pub fn get(&self, language: Language) -> &'static str {
        match language {
            Language::En => self.en,
            Language::Ar => self.ar,
        }
    }
}

pub const QUOTA_ERROR: Localized = Localized {
    en: "The assistant is currently handling too many requests. Please wait a few seconds and try again.",
    ar: "المساعد يتعامل حالياً مع عدد كبير من الطلبات. يرجى الانتظار لبضع ثوان ثم المحاولة مرة أخرى.",
};

pub const GENERIC_ERROR: Localized = Localized {
    en: "An unexpected error occurred. Please try again later.",
    ar: "حدث خطأ غير متوقع. يرجى المحاولة مرة أخرى لاحقاً.",
};

pub fn failure_message(kind: FailureKind, language: Language) -> &'static str {
    match kind {
        FailureKind::QuotaExhausted => QUOTA_ERROR.get(language),
        FailureKind::Generic => GENERIC_ERROR.get(language),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportSection {
    pub id: &'static str,
    pub title: &'static str,
    pub description: &'static str,
    pub title_ar: &'static str,
    pub description_ar: &'static str,
}

// TP-152 (2025) template sections, in report order.
pub const REPORT_SECTIONS: [ReportSection; 7] = [
    ReportSection {
        id: "prev",
        title: "A. Previous Improvement Plans",
        description: "Track completion % linked to KPIs and specific evidence.",
        title_ar: "أ. خطط التحسين من العام السابق",
        description_ar: "متابعة نسبة الإنجاز المرتبطة بالمؤشرات والأدلة المحددة.",
    },
    ReportSection {
        id: "stats",
        title: "B. Program Statistics",
        description: "Deep analysis of enrolment and graduation trends.",
        title_ar: "ب. إحصائيات البرنامج",
        description_ar: "تحليل عميق لاتجاهات التسجيل والتخرج.",
    },
    ReportSection {
        id: "assessment",
        title: "C. Program Assessment",
        description: "Interpretation of PLO gaps and stakeholder feedback.",
        title_ar: "ج. تقويم البرنامج",
        description_ar: "تفسير فجوات مخرجات التعلم وآراء أصحاب المصلحة.",
    },
    ReportSection {
        id: "kpis",
        title: "D. Program KPIs",
        description: "What do the indicators actually say about quality?",
        title_ar: "د. مؤشرات أداء البرنامج",
        description_ar: "ماذا تقول المؤشرات فعلياً عن جودة البرنامج؟",
    },
    ReportSection {
        id: "challenges",
        title: "E. Challenges & Difficulties",
        description: "Identifying root causes of obstacles.",
        title_ar: "هـ. التحديات والصعوبات",
        description_ar: "تحديد الأسباب الجذرية للعقبات.",
    },
    ReportSection {
        id: "devplan",
        title: "F. Program Development Plan",
        description: "Multi-action plans merging carry-over and new recs.",
        title_ar: "و. خطة تطوير البرنامج",
        description_ar: "خطط متعددة الإجراءات تدمج المهام المرحلة والتوصيات الجديدة.",
    },
    ReportSection {
        id: "approval",
        title: "G. Approval of Report",
        description: "Council details and reference numbers.",
        title_ar: "ز. اعتماد التقرير",
        description_ar: "تفاصيل المجلس وأرقام المرجع.",
    },
];

pub fn find_section(id: &str) -> Option<&'static ReportSection> {
    REPORT_SECTIONS
        .iter()
        .find(|section| section.id.eq_ignore_ascii_case(id.trim()))
}
