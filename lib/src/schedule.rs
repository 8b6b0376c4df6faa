//! Course calendar.

use std::collections::BTreeMap;

use chrono::{NaiveDate, NaiveTime};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::data::Comment;
use crate::votes::Votes;

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Aula,
    Orientacao,
    Seminario,
    Prova,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ScheduleEvent {
    pub id: String,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub title: String,
    pub professor: Option<String>,
    #[serde(rename = "type")]
    pub kind: EventKind,
    pub details: Option<String>,
    pub color: String,
    #[serde(flatten)]
    pub votes: Votes,
    #[serde(default)]
    pub comments: Vec<Comment>,
}

/// Sorts events by date, then start time, then id.
pub fn sort_events(events: &mut [ScheduleEvent]) {
    events.sort_by(|a, b| {
        (a.date, a.start_time, a.id.as_str()).cmp(&(b.date, b.start_time, b.id.as_str()))
    });
}

/// Events bucketed per day, each day in start-time order.
pub fn events_by_day(events: &[ScheduleEvent]) -> BTreeMap<NaiveDate, Vec<&ScheduleEvent>> {
    let mut days: BTreeMap<NaiveDate, Vec<&ScheduleEvent>> = BTreeMap::new();

    for event in events {
        days.entry(event.date).or_default().push(event);
    }

    for day in days.values_mut() {
        day.sort_by_key(|event| event.start_time);
    }

    days
}

const MORNING: (&str, &str) = ("08:00", "12:00");
const AFTERNOON: (&str, &str) = ("14:00", "18:00");

const GESTAO: &str = "Gestão, Organização e Pessoas no Banco Central do Brasil";
const SFN: &str = "Sistema Financeiro Nacional, Banco Central do Brasil e Bancos Centrais";
const CIBER: &str = "Segurança Cibernética";
const EDUCACAO: &str = "Educação Financeira";
const VAGO: &str = "VAGO - Deslocamento dos candidatos/alunos";
const PROVA: &str = "PROVA OBJETIVA DO PROCAP";

const BARBARA: Option<&str> = Some("Profa: Barbara Lis Silveira");
const CESAR: Option<&str> = Some("Prof: Cesar de Oliveira Frade");
const FRANCISCO: Option<&str> = Some("Prof: Francisco Fernando Viana Ferreira");
const CIBER_PROFS: Option<&str> =
    Some("Prof: Carlos Eduardo Gomes Marins, Prof: Marcos José Candido Euzebio");
const FABIO_FONSECA: Option<&str> = Some("Prof: Fabio dos Santos Fonseca");
const FABIO_ARAUJO: Option<&str> = Some("Prof: Fábio de Almeida Lopes Araujo");
const ASYNC: Option<&str> = Some("*Aula Assíncrona");

type SeedRow = (
    &'static str,
    &'static str,
    (&'static str, &'static str),
    &'static str,
    Option<&'static str>,
    EventKind,
    Option<&'static str>,
    &'static str,
);

#[rustfmt::skip]
const SEED: &[SeedRow] = &[
    ("1a", "2025-11-03", MORNING, "Orientações e Integração On-line com a comissão", None, EventKind::Orientacao, None, "bg-yellow-400"),
    ("1b", "2025-11-03", AFTERNOON, GESTAO, BARBARA, EventKind::Aula, None, "bg-cyan-400"),
    ("2a", "2025-11-04", MORNING, GESTAO, BARBARA, EventKind::Aula, None, "bg-cyan-400"),
    ("2b", "2025-11-04", AFTERNOON, SFN, CESAR, EventKind::Aula, None, "bg-rose-400"),
    ("3a", "2025-11-05", MORNING, SFN, CESAR, EventKind::Aula, None, "bg-rose-400"),
    ("3b", "2025-11-05", AFTERNOON, SFN, CESAR, EventKind::Aula, None, "bg-rose-400"),
    ("4a", "2025-11-06", MORNING, SFN, CESAR, EventKind::Aula, None, "bg-rose-400"),
    ("4b", "2025-11-06", AFTERNOON, SFN, CESAR, EventKind::Aula, None, "bg-rose-400"),
    ("5a", "2025-11-07", MORNING, SFN, CESAR, EventKind::Aula, None, "bg-rose-400"),
    ("5b", "2025-11-07", AFTERNOON, SFN, CESAR, EventKind::Aula, None, "bg-rose-400"),
    ("6a", "2025-11-08", MORNING, SFN, FRANCISCO, EventKind::Aula, ASYNC, "bg-rose-400"),
    ("6b", "2025-11-08", AFTERNOON, SFN, FRANCISCO, EventKind::Aula, ASYNC, "bg-rose-400"),
    ("7a", "2025-11-10", MORNING, CIBER, CIBER_PROFS, EventKind::Aula, None, "bg-lime-400"),
    ("7b", "2025-11-10", AFTERNOON, CIBER, CIBER_PROFS, EventKind::Aula, None, "bg-lime-400"),
    ("8a", "2025-11-11", MORNING, SFN, CESAR, EventKind::Aula, None, "bg-rose-400"),
    ("8b", "2025-11-11", AFTERNOON, SFN, CESAR, EventKind::Aula, None, "bg-rose-400"),
    ("9a", "2025-11-12", MORNING, SFN, CESAR, EventKind::Aula, None, "bg-rose-400"),
    ("9b", "2025-11-12", AFTERNOON, SFN, CESAR, EventKind::Aula, None, "bg-rose-400"),
    ("10a", "2025-11-13", MORNING, "Segurança da Informação no Banco Central", FABIO_FONSECA, EventKind::Aula, None, "bg-green-400"),
    ("10b", "2025-11-13", AFTERNOON, "Segurança Institucional", FABIO_FONSECA, EventKind::Aula, None, "bg-teal-400"),
    ("11a", "2025-11-14", MORNING, EDUCACAO, FABIO_ARAUJO, EventKind::Aula, None, "bg-pink-400"),
    ("11b", "2025-11-14", AFTERNOON, SFN, CESAR, EventKind::Aula, None, "bg-rose-400"),
    ("12a", "2025-11-15", MORNING, SFN, FRANCISCO, EventKind::Aula, ASYNC, "bg-rose-400"),
    ("12b", "2025-11-15", AFTERNOON, SFN, FRANCISCO, EventKind::Aula, ASYNC, "bg-rose-400"),
    ("13a", "2025-11-17", MORNING, EDUCACAO, FABIO_ARAUJO, EventKind::Aula, None, "bg-pink-400"),
    ("13b", "2025-11-17", AFTERNOON, EDUCACAO, FABIO_ARAUJO, EventKind::Aula, None, "bg-pink-400"),
    ("14a", "2025-11-18", MORNING, EDUCACAO, FABIO_ARAUJO, EventKind::Aula, None, "bg-pink-400"),
    ("14b", "2025-11-18", AFTERNOON, EDUCACAO, FABIO_ARAUJO, EventKind::Aula, None, "bg-pink-400"),
    ("15a", "2025-11-19", MORNING, EDUCACAO, FABIO_ARAUJO, EventKind::Aula, None, "bg-pink-400"),
    ("15b", "2025-11-19", AFTERNOON, VAGO, None, EventKind::Seminario, None, "bg-gray-400"),
    ("16a", "2025-11-20", MORNING, VAGO, None, EventKind::Seminario, None, "bg-gray-400"),
    ("16b", "2025-11-20", AFTERNOON, VAGO, None, EventKind::Seminario, None, "bg-gray-400"),
    ("17a", "2025-11-21", MORNING, VAGO, None, EventKind::Seminario, None, "bg-gray-400"),
    ("17b", "2025-11-21", AFTERNOON, VAGO, None, EventKind::Seminario, None, "bg-gray-400"),
    ("18a", "2025-11-22", MORNING, PROVA, None, EventKind::Prova, None, "bg-green-600"),
    ("18b", "2025-11-22", AFTERNOON, PROVA, None, EventKind::Prova, None, "bg-green-600"),
];

/// The PROCAP course calendar, used to seed an empty `schedule_events` table.
pub static COURSE_SCHEDULE: Lazy<Vec<ScheduleEvent>> = Lazy::new(|| {
    SEED.iter()
        .map(|&(id, date, (start, end), title, professor, kind, details, color)| ScheduleEvent {
            id: id.to_owned(),
            date: NaiveDate::parse_from_str(date, "%Y-%m-%d").expect("invalid seed date"),
            start_time: NaiveTime::parse_from_str(start, "%H:%M").expect("invalid seed time"),
            end_time: NaiveTime::parse_from_str(end, "%H:%M").expect("invalid seed time"),
            title: title.to_owned(),
            professor: professor.map(str::to_owned),
            kind,
            details: details.map(str::to_owned),
            color: color.to_owned(),
            votes: Votes::default(),
            comments: Vec::new(),
        })
        .collect()
});
