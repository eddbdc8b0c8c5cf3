use ics::{
    components::Property,
    escape_text,
    parameters::TzIDParam,
    properties::{Description, DtEnd, DtStart, Location, Summary, TzName},
    Standard, TimeZone,
};

use crate::{Event, Schedule};

const TZID: &str = "Asia/Tokyo";
const DATE_TIME: &str = "%Y%m%dT%H%M%S";

impl Schedule {
    #[must_use]
    pub fn to_ics(&self) -> ics::ICalendar<'_> {
        let mut jst = Standard::new("19700101T000000", "+0900", "+0900");
        jst.push(TzName::new("JST"));

        let mut icalendar = ics::ICalendar::new(
            "2.0",
            format!("-//NAIST//schedule {}-{:02}//JA", self.year, self.month),
        );
        icalendar.push(Property::new(
            "X-WR-CALNAME",
            format!("NAIST {}-{:02}", self.year, self.month),
        ));
        icalendar.add_timezone(TimeZone::standard(TZID, jst));

        for event in &self.events {
            icalendar.add_event(event.to_ics());
        }

        icalendar
    }
}

impl Event {
    #[must_use]
    pub fn to_ics(&self) -> ics::Event<'_> {
        let start = self.starttime.format(DATE_TIME).to_string();
        let end = self.endtime.format(DATE_TIME).to_string();

        let id = format!(
            "{}-{}@syllabus.naist.jp",
            self.starttime.format("%Y%m"),
            self.cell_id()
        );

        let mut ics_event = ics::Event::new(id, start.clone());

        let mut dtstart = DtStart::new(start);
        dtstart.add(TzIDParam::new(TZID));
        ics_event.push(dtstart);

        let mut dtend = DtEnd::new(end);
        dtend.add(TzIDParam::new(TZID));
        ics_event.push(dtend);

        ics_event.push(Summary::new(escape_text(self.class.as_str())));

        if !self.classroom.is_empty() {
            ics_event.push(Location::new(escape_text(self.classroom.as_str())));
        }

        ics_event.push(Description::new(escape_text(self.description())));

        ics_event
    }
}
