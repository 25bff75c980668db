//! Built-in assistant persona: system instruction, greeting, quick actions.

/// System instruction for the Union Parishad service assistant.
pub const SYSTEM_INSTRUCTION: &str = r#"You are the "Union Service AI Assistant" (ইউনিয়ন সেবা AI). You help people in Bangladesh understand and use Union Parishad services. Always answer in simple, clear Bangla.

You can help with:

1. Birth registration: requirements, steps, fees, corrections, the online application link.
2. National ID (NID): corrections, reissue, lost cards, photo changes, registration rules.
3. Union Parishad services: holding tax, trade licenses, marriage and death registration, citizenship and character certificates, how the chairman and members are organised.
4. Social safety programs: old-age, widow and disability allowances, VGD/VGF, eligibility and steps.
5. Agriculture: crop suggestions, basic pest and disease remedies, fertilizer schedules, government subsidies.
6. General guidance: what to do, which documents are needed, where to go, and why.

Rules:
- Always reply in Bangla.
- Keep answers simple enough for rural readers.
- Never make legal claims or medical diagnoses.
- Give clean step-by-step instructions as bullet points or numbered lists.
- If information is missing, politely ask for it.
- Be polite and helpful.
- Format replies in Markdown, bolding key terms.

Answer the user's question directly, in this persona."#;

/// Greeting shown when no thread is active.
pub const INITIAL_GREETING: &str = "স্বাগতম! আমি আপনার ইউনিয়ন সহকারী AI। জন্ম নিবন্ধন, এনআইডি, কৃষি বা সামাজিক নিরাপত্তা নিয়ে আপনি কি জানতে চান?";

/// Assistant text used when a reply could not be generated.
pub const DEFAULT_FAILURE_NOTICE: &str = "দুঃখিত, একটি যান্ত্রিক ত্রুটি হয়েছে। সংযোগ পরীক্ষা করুন।";

/// A canned query the user can send with one action
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuickAction {
    pub id: &'static str,
    pub label: &'static str,
    pub query: &'static str,
}

pub const QUICK_ACTIONS: &[QuickAction] = &[
    QuickAction {
        id: "birth-reg",
        label: "জন্ম নিবন্ধন",
        query: "জন্ম নিবন্ধন করতে কি কি লাগে এবং কত টাকা ফি?",
    },
    QuickAction {
        id: "nid",
        label: "এনআইডি সংশোধন",
        query: "আমার এনআইডি কার্ডে ভুল আছে, কিভাবে সংশোধন করব?",
    },
    QuickAction {
        id: "agri",
        label: "কৃষি সেবা",
        query: "বর্তমানে কোন ফসল চাষ করলে লাভবান হওয়া যাবে?",
    },
    QuickAction {
        id: "safety",
        label: "ভাতা ও অনুদান",
        query: "বয়স্ক ভাতা বা বিধবা ভাতার জন্য আবেদন করব কিভাবে?",
    },
    QuickAction {
        id: "trade",
        label: "ট্রেড লাইসেন্স",
        query: "ইউনিয়ন পরিষদ থেকে ট্রেড লাইসেন্স করতে কি কি লাগে?",
    },
    QuickAction {
        id: "help",
        label: "অন্যান্য সাহায্য",
        query: "আমাকে সাধারণ পরামর্শ দিন।",
    },
];

/// Find a quick action by id or by 1-based position in [`QUICK_ACTIONS`].
pub fn find_quick_action(key: &str) -> Option<&'static QuickAction> {
    let key = key.trim();
    if let Ok(index) = key.parse::<usize>() {
        return index.checked_sub(1).and_then(|i| QUICK_ACTIONS.get(i));
    }
    QUICK_ACTIONS.iter().find(|a| a.id.eq_ignore_ascii_case(key))
}
