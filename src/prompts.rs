//! Reply text for each dialogue step

use crate::slots::MAX_AGE;
use crate::triage::Ward;

/// First question after the ward is known
pub fn ask_name(ward: Ward) -> String {
    match ward {
        Ward::GeneralWard => {
            "Thank you for contacting the General Ward. May I please have your name?".to_string()
        }
        Ward::EmergencyWard => "This is the Emergency Ward. I need to collect some information \
             quickly. What is the patient's name?"
            .to_string(),
        Ward::MentalHealthWard => "Thank you for reaching out to the Mental Health Ward. To \
             assist you better, could you please provide your name?"
            .to_string(),
    }
}

pub fn reask_name(ward: Ward) -> String {
    match ward {
        Ward::EmergencyWard => "I still need the patient's name. Please type it.".to_string(),
        _ => "Sorry, I didn't catch that. Could you please tell me your name?".to_string(),
    }
}

pub fn ask_age(ward: Ward, name: &str) -> String {
    match ward {
        Ward::EmergencyWard => format!("Thank you. What is {name}'s age?"),
        _ => format!("Thank you, {name}. Could you please provide your age?"),
    }
}

/// Age re-prompt; becomes more explicit after the first miss
pub fn reask_age(retries: u32) -> String {
    if retries <= 1 {
        "I couldn't find an age in that. Please reply with the age as a number, for example 42."
            .to_string()
    } else {
        format!(
            "Please enter digits only, a number between 1 and {}.",
            MAX_AGE - 1
        )
    }
}

pub fn ask_query(ward: Ward) -> String {
    match ward {
        Ward::GeneralWard => {
            "Thank you. Could you please describe your concern or the reason for your visit?"
                .to_string()
        }
        Ward::EmergencyWard => "Please describe the emergency situation or symptoms.".to_string(),
        Ward::MentalHealthWard => {
            "Could you please share what brings you to the Mental Health Ward today?".to_string()
        }
    }
}

pub fn reask_query(ward: Ward) -> String {
    match ward {
        Ward::EmergencyWard => "Please describe the symptoms in a few words.".to_string(),
        _ => "Could you describe your concern in a few words?".to_string(),
    }
}

/// Closing acknowledgment once every slot is filled
pub fn closing(ward: Ward, name: &str) -> String {
    match ward {
        Ward::EmergencyWard => format!(
            "Emergency information recorded for {name}. Medical staff are being notified immediately."
        ),
        Ward::MentalHealthWard => format!(
            "Thank you, {name}. Your information has been sent to the Mental Health Ward. \
             A mental health professional will contact you soon."
        ),
        Ward::GeneralWard => format!(
            "Thank you, {name}. Your information has been recorded and you've been routed to \
             the {}. A staff member will be with you shortly.",
            ward.display_name()
        ),
    }
}

pub fn already_recorded(name: &str) -> String {
    format!(
        "Your request has already been recorded, {name}. A staff member will be with you \
         shortly. Please start a new session to submit another request."
    )
}
